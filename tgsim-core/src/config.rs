//! Client configuration.
//!
//! Values come from `TGSIM_*` environment variables. Anything missing or
//! malformed falls back to its default; malformed values are logged.

use crate::providers::EnvProvider;
use std::str::FromStr;
use std::time::Duration;

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Path of the realtime metrics stream when derived from the API URL.
pub const DEFAULT_WS_PATH: &str = "/ws/metrics";

/// Upper bound on the reconnect backoff multiplier.
pub const BACKOFF_CAP: u32 = 3;

/// How the session credential is presented to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `X-API-Key: <token>`
    #[default]
    ApiKey,
    /// `Authorization: Bearer <token>`
    Bearer,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api-key" | "api_key" | "apikey" | "x-api-key" => Ok(Self::ApiKey),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!("unknown auth scheme '{other}'")),
        }
    }
}

/// Reconnect and keep-alive settings for the realtime stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Abnormal closures tolerated before giving up.
    pub max_attempts: u32,
    /// Base delay between reconnect attempts.
    pub base_interval: Duration,
    /// Interval between keep-alive pings while connected.
    pub heartbeat_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_interval: Duration::from_millis(3000),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (1-based).
    ///
    /// Grows linearly with the attempt and stops growing after the third.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_interval * attempt.clamp(1, BACKOFF_CAP)
    }
}

/// Configuration for the request client, realtime stream and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base URL.
    pub api_url: String,
    /// Explicit realtime stream URL; derived from `api_url` when absent.
    pub ws_url: Option<String>,
    /// Whether to attempt the realtime stream at all.
    pub realtime: bool,
    /// Default per-request timeout.
    pub request_timeout: Option<Duration>,
    /// Interval for REST polling when streaming is unavailable.
    pub poll_interval: Duration,
    /// Credential header style.
    pub auth_scheme: AuthScheme,
    /// Realtime reconnect policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: None,
            realtime: true,
            request_timeout: None,
            poll_interval: Duration::from_secs(10),
            auth_scheme: AuthScheme::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TGSIM_API_URL`: REST base URL
    /// - `TGSIM_WS_URL`: realtime stream URL
    /// - `TGSIM_REALTIME`: "false"/"0" disables the stream
    /// - `TGSIM_TIMEOUT_MS`: default request timeout
    /// - `TGSIM_POLL_INTERVAL_SECS`: polling interval
    /// - `TGSIM_AUTH_SCHEME`: "api-key" or "bearer"
    /// - `TGSIM_RECONNECT_MAX_ATTEMPTS`, `TGSIM_RECONNECT_INTERVAL_MS`,
    ///   `TGSIM_HEARTBEAT_SECS`: reconnect policy
    pub fn from_env(env: &dyn EnvProvider) -> Self {
        let defaults = Self::default();
        let reconnect_defaults = ReconnectConfig::default();

        let api_url = non_empty(env, "TGSIM_API_URL").unwrap_or(defaults.api_url);
        let ws_url = non_empty(env, "TGSIM_WS_URL");
        let realtime = non_empty(env, "TGSIM_REALTIME")
            .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "off" | "no"))
            .unwrap_or(defaults.realtime);

        let request_timeout =
            parse_var::<u64>(env, "TGSIM_TIMEOUT_MS").map(Duration::from_millis);
        let poll_interval = parse_var::<u64>(env, "TGSIM_POLL_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        let auth_scheme = parse_var::<AuthScheme>(env, "TGSIM_AUTH_SCHEME")
            .unwrap_or(defaults.auth_scheme);

        let reconnect = ReconnectConfig {
            max_attempts: parse_var(env, "TGSIM_RECONNECT_MAX_ATTEMPTS")
                .unwrap_or(reconnect_defaults.max_attempts),
            base_interval: parse_var::<u64>(env, "TGSIM_RECONNECT_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(reconnect_defaults.base_interval),
            heartbeat_interval: parse_var::<u64>(env, "TGSIM_HEARTBEAT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(reconnect_defaults.heartbeat_interval),
        };

        Self {
            api_url,
            ws_url,
            realtime,
            request_timeout,
            poll_interval,
            auth_scheme,
            reconnect,
        }
    }

    /// Override the REST base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Realtime stream URL, explicit or derived from the API URL.
    ///
    /// Derivation swaps `http`/`https` for `ws`/`wss` and keeps only the
    /// origin. Returns `None` when the API URL has no recognisable scheme.
    pub fn stream_url(&self) -> Option<String> {
        if let Some(url) = &self.ws_url {
            return Some(url.clone());
        }
        let (scheme, rest) = self.api_url.split_once("://")?;
        let ws_scheme = match scheme {
            "http" => "ws",
            "https" => "wss",
            _ => return None,
        };
        let host = rest.split('/').next().filter(|h| !h.is_empty())?;
        Some(format!("{ws_scheme}://{host}{DEFAULT_WS_PATH}"))
    }
}

fn non_empty(env: &dyn EnvProvider, key: &str) -> Option<String> {
    env.var(key).filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(env: &dyn EnvProvider, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = non_empty(env, key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring malformed setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEnv;

    #[test]
    fn defaults_from_empty_env() {
        let config = ClientConfig::from_env(&MockEnv::new());
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let env = MockEnv::from_pairs(&[
            ("TGSIM_API_URL", "https://sim.example/api"),
            ("TGSIM_WS_URL", "wss://stream.example/live"),
            ("TGSIM_REALTIME", "off"),
            ("TGSIM_TIMEOUT_MS", "2500"),
            ("TGSIM_POLL_INTERVAL_SECS", "3"),
            ("TGSIM_AUTH_SCHEME", "bearer"),
            ("TGSIM_RECONNECT_MAX_ATTEMPTS", "2"),
            ("TGSIM_RECONNECT_INTERVAL_MS", "100"),
            ("TGSIM_HEARTBEAT_SECS", "7"),
        ]);
        let config = ClientConfig::from_env(&env);

        assert_eq!(config.api_url, "https://sim.example/api");
        assert_eq!(config.stream_url().as_deref(), Some("wss://stream.example/live"));
        assert!(!config.realtime);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert_eq!(config.reconnect.max_attempts, 2);
        assert_eq!(config.reconnect.base_interval, Duration::from_millis(100));
        assert_eq!(config.reconnect.heartbeat_interval, Duration::from_secs(7));
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let env = MockEnv::from_pairs(&[
            ("TGSIM_POLL_INTERVAL_SECS", "soon"),
            ("TGSIM_RECONNECT_MAX_ATTEMPTS", "-1"),
        ]);
        let config = ClientConfig::from_env(&env);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn stream_url_derived_from_api_url() {
        let config = ClientConfig::default().with_api_url("https://sim.example:8443/api/v1");
        assert_eq!(
            config.stream_url().as_deref(),
            Some("wss://sim.example:8443/ws/metrics")
        );

        let config = ClientConfig::default().with_api_url("localhost:8000");
        assert_eq!(config.stream_url(), None);
    }

    #[test]
    fn backoff_is_capped_at_three_intervals() {
        let reconnect = ReconnectConfig {
            base_interval: Duration::from_millis(100),
            ..ReconnectConfig::default()
        };
        assert_eq!(reconnect.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(reconnect.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(reconnect.backoff_delay(3), Duration::from_millis(300));
        assert_eq!(reconnect.backoff_delay(7), Duration::from_millis(300));
    }
}
