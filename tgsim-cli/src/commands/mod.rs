//! CLI command implementations.

pub mod auth;
pub mod bots;
pub mod chats;
pub mod health;
pub mod metrics;
pub mod prefs;
pub mod version;
pub mod watch;

use anyhow::Result;
use serde::Serialize;
use tgsim_client::{Client, ClientError};
use tgsim_core::config::ClientConfig;
use tgsim_core::preferences::ViewMode;
use tgsim_core::session::SessionStore;

/// Hint printed whenever the backend needs a new credential.
pub const LOGIN_HINT: &str = "run `tgsim login --api-key <KEY>` to sign in again";

/// Everything a command talking to the backend needs.
pub struct Context {
    /// Authenticated API client.
    pub client: Client,
    /// Loaded configuration.
    pub config: ClientConfig,
    /// Persisted credential.
    pub session: SessionStore,
    /// How to render output.
    pub view: ViewMode,
}

/// Attach a user-facing description to client failures.
pub trait ApiContext<T> {
    /// Wrap the error with `action` and, for auth failures, the login hint.
    fn api_context(self, action: &str) -> Result<T>;
}

impl<T> ApiContext<T> for tgsim_client::Result<T> {
    fn api_context(self, action: &str) -> Result<T> {
        self.map_err(|e| {
            let message = if needs_login(&e) {
                format!("{action} failed: not authenticated; {LOGIN_HINT}")
            } else {
                format!("{action} failed ({})", e.code())
            };
            anyhow::Error::new(e).context(message)
        })
    }
}

/// Whether the error means the credential is missing or was rejected.
pub fn needs_login(err: &ClientError) -> bool {
    err.is_auth_failure() || matches!(err, ClientError::MissingCredential)
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a JSON value for a table cell.
pub fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_failures_get_login_hint() {
        let result: tgsim_client::Result<()> = Err(ClientError::Api {
            status: 401,
            body: "expired".into(),
        });
        let err = result.api_context("Listing bots").unwrap_err();
        assert!(err.to_string().contains("tgsim login"));

        let result: tgsim_client::Result<()> = Err(ClientError::MissingCredential);
        assert!(result.api_context("Listing bots").unwrap_err().to_string().contains("tgsim login"));
    }

    #[test]
    fn other_failures_carry_code() {
        let result: tgsim_client::Result<()> = Err(ClientError::Api {
            status: 503,
            body: "maintenance".into(),
        });
        let err = result.api_context("Fetching metrics").unwrap_err();
        assert_eq!(err.to_string(), "Fetching metrics failed (http_503)");
        assert!(format!("{err:#}").contains("maintenance"));
    }

    #[test]
    fn cells() {
        assert_eq!(cell(&json!(null)), "-");
        assert_eq!(cell(&json!("ok")), "ok");
        assert_eq!(cell(&json!(4.5)), "4.5");
    }
}
