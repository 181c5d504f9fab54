//! Connection state and realtime errors.

use std::fmt;
use thiserror::Error;

/// State of the realtime stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No active stream.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Stream established.
    Connected,
    /// Reconnects exhausted or abandoned; waits for a manual retry.
    Failed,
}

impl ConnectionState {
    /// Whether a stream is being opened or is open.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        })
    }
}

/// Problems reported by the connection manager.
///
/// These are published to subscribers, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// The transport refused to even start connecting.
    #[error("Stream setup failed: {0}")]
    Setup(String),
    /// The stream reported an error.
    #[error("Stream error: {0}")]
    Stream(String),
    /// An inbound frame was not valid JSON.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    /// The keep-alive ping could not be queued.
    #[error("Keep-alive failed: {0}")]
    Heartbeat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
    }

    #[test]
    fn active_states() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Connected.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(!ConnectionState::Failed.is_active());
    }
}
