//! tgsim Core Library
//!
//! Shared building blocks for the tgsim admin client: the capabilities the
//! request client and the realtime connection manager are parameterised
//! over, the persisted session credential, and process configuration.
//!
//! # Key Components
//!
//! - **Providers**: clock, connectivity, environment and key-value storage,
//!   each with a real and a mock implementation
//! - **Session**: the injectable store holding the API credential
//! - **Preferences**: persisted view-mode and theme settings
//! - **Config**: client configuration read from the environment
//! - **Observability**: tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tgsim_core::providers::{MemoryStore, MockEnv};
//! use tgsim_core::session::SessionStore;
//!
//! let session = SessionStore::new(Arc::new(MemoryStore::new()));
//! let env = MockEnv::new().with_var("TGSIM_API_KEY", "bootstrap-key");
//!
//! session.bootstrap(&env);
//! assert_eq!(session.get().as_deref(), Some("bootstrap-key"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod observability;
pub mod preferences;
pub mod providers;
pub mod session;

pub use config::{AuthScheme, ClientConfig, ReconnectConfig};
pub use error::{CoreError, Result};
pub use preferences::{Preferences, Theme, ViewMode};
pub use session::SessionStore;
