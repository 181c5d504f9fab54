//! Error types for the tgsim client.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification attached to every [`ClientError`].
///
/// The set is closed: callers can branch on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Non-2xx HTTP response with the given status.
    Http(u16),
    /// Transport-level failure (DNS, refused connection, reset).
    Network,
    /// The platform reported no connectivity; nothing was sent.
    Offline,
    /// The client-side deadline elapsed.
    Timeout,
    /// The caller cancelled the request.
    Aborted,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(status) => write!(f, "http_{status}"),
            Self::Network => f.write_str("network"),
            Self::Offline => f.write_str("offline"),
            Self::Timeout => f.write_str("timeout"),
            Self::Aborted => f.write_str("aborted"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Failure raised by the transport underneath the client.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach or talk to the server.
    #[error("Connection failed: {0}")]
    Connection(String),
    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// Errors that can occur when using the tgsim client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No session credential is configured; nothing was sent.
    #[error(
        "No API key configured. Run `tgsim login --api-key <KEY>` or set TGSIM_API_KEY before calling the API"
    )]
    MissingCredential,

    /// Server returned a non-2xx response.
    #[error("API error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request never got a response.
    #[error("Network error: {0}")]
    Network(#[source] TransportError),

    /// The platform reports no connectivity.
    #[error("Network unavailable: the client is offline")]
    Offline,

    /// The request deadline elapsed before the server answered.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The caller cancelled the request.
    #[error("Request aborted by caller")]
    Aborted,

    /// Invalid base URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request descriptor was malformed (bad header name or value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to deserialize the response.
    #[error("Failed to deserialize response: {0}")]
    Deserialize(#[source] serde_json::Error),
}

impl ClientError {
    /// Classification code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Api { status, .. } => ErrorCode::Http(*status),
            Self::Network(_) => ErrorCode::Network,
            Self::Offline => ErrorCode::Offline,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Aborted => ErrorCode::Aborted,
            Self::MissingCredential
            | Self::InvalidUrl(_)
            | Self::InvalidRequest(_)
            | Self::Serialize(_)
            | Self::Deserialize(_) => ErrorCode::Unknown,
        }
    }

    /// HTTP status, for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, for API errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human-oriented detail extracted from an API error body.
    ///
    /// JSON bodies of the form `{"detail": ..}`, `{"error": ..}` or
    /// `{"message": ..}` yield that field; anything else yields the body.
    pub fn detail(&self) -> Option<String> {
        let body = self.body()?;
        let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
            return Some(body.to_string());
        };
        let message = ["detail", "error", "message"]
            .iter()
            .find_map(|field| json[*field].as_str())
            .unwrap_or(body);
        Some(message.to_string())
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::Offline | ErrorCode::Timeout | ErrorCode::Network
        )
    }

    /// Whether the backend rejected the credential.
    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_strings() {
        assert_eq!(ErrorCode::Http(404).to_string(), "http_404");
        assert_eq!(ErrorCode::Network.to_string(), "network");
        assert_eq!(ErrorCode::Offline.to_string(), "offline");
        assert_eq!(ErrorCode::Timeout.to_string(), "timeout");
        assert_eq!(ErrorCode::Aborted.to_string(), "aborted");
        assert_eq!(ErrorCode::Unknown.to_string(), "unknown");
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = ClientError::Api {
            status: 404,
            body: "Not found".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::Http(404));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("Not found"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn detail_prefers_json_fields() {
        let err = ClientError::Api {
            status: 422,
            body: r#"{"detail":"name is required"}"#.to_string(),
        };
        assert_eq!(err.detail().as_deref(), Some("name is required"));

        let err = ClientError::Api {
            status: 500,
            body: "<html>oops</html>".to_string(),
        };
        assert_eq!(err.detail().as_deref(), Some("<html>oops</html>"));
    }

    #[test]
    fn every_variant_has_a_message() {
        let errors = [
            ClientError::MissingCredential,
            ClientError::Network(TransportError::Connection("refused".into())),
            ClientError::Offline,
            ClientError::Timeout(Duration::from_millis(50)),
            ClientError::Aborted,
            ClientError::InvalidUrl("x".into()),
            ClientError::InvalidRequest("bad header".into()),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(ClientError::Offline.is_retryable());
        assert!(ClientError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ClientError::Network(TransportError::Connection("reset".into())).is_retryable());
        assert!(!ClientError::Aborted.is_retryable());
        assert!(!ClientError::MissingCredential.is_retryable());
    }

    #[test]
    fn unauthorized_is_auth_failure() {
        let err = ClientError::Api {
            status: 401,
            body: String::new(),
        };
        assert!(err.is_auth_failure());
        assert_eq!(err.code().to_string(), "http_401");
    }
}
