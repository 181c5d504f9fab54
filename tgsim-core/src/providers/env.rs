//! Environment variable provider.
//!
//! Configuration and the bootstrap credential are read through this trait so
//! tests never touch the real process environment.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Provider trait for environment variable lookups.
pub trait EnvProvider: Send + Sync {
    /// Get an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Check if this is a mock provider.
    fn is_mock(&self) -> bool;
}

/// Real environment provider that uses actual environment variables.
#[derive(Debug, Clone, Default)]
pub struct RealEnv;

impl RealEnv {
    /// Create a new real environment provider.
    pub fn new() -> Self {
        Self
    }
}

impl EnvProvider for RealEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock environment provider for testing.
///
/// # Example
///
/// ```
/// use tgsim_core::providers::{EnvProvider, MockEnv};
///
/// let env = MockEnv::new()
///     .with_var("TGSIM_API_URL", "http://localhost:9000")
///     .with_var("TGSIM_REALTIME", "false");
///
/// assert_eq!(env.var("TGSIM_API_URL").as_deref(), Some("http://localhost:9000"));
/// assert_eq!(env.var("MISSING"), None);
/// ```
#[derive(Debug, Default)]
pub struct MockEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MockEnv {
    /// Create a new empty mock environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable to the mock environment.
    pub fn with_var(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.write().insert(key.into(), value.into());
        self
    }

    /// Create a mock environment from key-value pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }
}

impl EnvProvider for MockEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_env_from_pairs() {
        let env = MockEnv::from_pairs(&[("A", "1"), ("B", "2")]);

        assert_eq!(env.var("A"), Some("1".to_string()));
        assert_eq!(env.var("B"), Some("2".to_string()));
        assert_eq!(env.var("C"), None);
    }

    #[test]
    fn mock_env_isolation() {
        let key = "TGSIM_TEST_ISOLATION_KEY";
        let env = MockEnv::new().with_var(key, "mock_value");

        assert_eq!(env.var(key), Some("mock_value".to_string()));
        assert!(std::env::var(key).is_err());
    }
}
