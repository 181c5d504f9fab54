//! Session credential storage.
//!
//! The credential is shared process-wide: every request reads it, login and
//! logout write it, and the request client clears it when the backend
//! answers 401. All of that goes through one [`SessionStore`] handle that is
//! passed to the client at construction.

use crate::error::Result;
use crate::providers::{EnvProvider, KeyValueStore};
use std::sync::Arc;

/// Store key holding the API credential.
pub const SESSION_KEY: &str = "tgsim.session.api_key";

/// Environment variable carrying a bootstrap credential.
pub const API_KEY_ENV: &str = "TGSIM_API_KEY";

/// Injectable handle to the persisted session credential.
///
/// Cloning is cheap and all clones see the same credential.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store on top of a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current credential, if any. Blank values count as absent.
    pub fn get(&self) -> Option<String> {
        self.store
            .get(SESSION_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Whether a credential is configured.
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Replace the credential.
    pub fn set(&self, api_key: &str) -> Result<()> {
        self.store.set(SESSION_KEY, api_key.trim())
    }

    /// Forget the credential.
    ///
    /// Failure to persist the removal is logged, not returned: callers clear
    /// the credential on error paths where there is nothing left to do.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!(error = %e, "Failed to persist credential removal");
        }
    }

    /// Seed the credential from `TGSIM_API_KEY` when none is stored.
    ///
    /// Returns true if the environment value was adopted.
    pub fn bootstrap(&self, env: &dyn EnvProvider) -> bool {
        if self.is_set() {
            return false;
        }
        let Some(key) = env.var(API_KEY_ENV).filter(|k| !k.trim().is_empty()) else {
            return false;
        };
        match self.set(&key) {
            Ok(()) => {
                tracing::debug!("Adopted bootstrap credential from environment");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store bootstrap credential");
                false
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("is_set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemoryStore, MockEnv};

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn set_get_clear() {
        let session = session();
        assert!(!session.is_set());

        session.set("abc").unwrap();
        assert_eq!(session.get().as_deref(), Some("abc"));

        session.clear();
        assert_eq!(session.get(), None);
    }

    #[test]
    fn clones_share_credential() {
        let a = session();
        let b = a.clone();

        a.set("shared").unwrap();
        assert_eq!(b.get().as_deref(), Some("shared"));

        b.clear();
        assert!(!a.is_set());
    }

    #[test]
    fn blank_credential_is_absent() {
        let session = SessionStore::new(Arc::new(MemoryStore::from_pairs(&[(SESSION_KEY, "  ")])));
        assert!(!session.is_set());
    }

    #[test]
    fn bootstrap_only_when_empty() {
        let env = MockEnv::new().with_var(API_KEY_ENV, "from-env");

        let empty = session();
        assert!(empty.bootstrap(&env));
        assert_eq!(empty.get().as_deref(), Some("from-env"));

        let existing = session();
        existing.set("stored").unwrap();
        assert!(!existing.bootstrap(&env));
        assert_eq!(existing.get().as_deref(), Some("stored"));
    }

    #[test]
    fn bootstrap_ignores_blank_env() {
        let env = MockEnv::new().with_var(API_KEY_ENV, "");
        let session = session();
        assert!(!session.bootstrap(&env));
        assert!(!session.is_set());
    }
}
