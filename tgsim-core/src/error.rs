//! Error types for tgsim-core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by storage and configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Writing the persistent store failed.
    #[error("Failed to write store at {path}: {cause}")]
    StoreWrite {
        /// Location of the store document.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// A persisted value could not be encoded.
    #[error("Failed to encode value for key '{key}': {cause}")]
    Encode {
        /// Store key being written.
        key: String,
        /// Reason for the failure.
        cause: String,
    },

    /// No location could be determined for the persistent store.
    #[error("No store location available; set TGSIM_STORE_PATH")]
    NoStoreLocation,

    /// Invalid configuration value.
    #[error("Invalid configuration for {key}: {cause}")]
    Config {
        /// Environment variable or setting name.
        key: String,
        /// Reason the value was rejected.
        cause: String,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
