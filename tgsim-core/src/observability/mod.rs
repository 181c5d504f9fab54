//! Observability setup for tgsim.
//!
//! Structured logging via `tracing`, with the output format controlled by
//! `TGSIM_LOG_FORMAT`:
//! - `json` - Structured JSON output
//! - `pretty` - Human-readable multi-line output (default for TTY)
//! - `compact` - Compact single-line output
//!
//! The filter comes from `TGSIM_LOG_LEVEL`, then `RUST_LOG`, then `warn`.
//! Logs go to stderr so command output on stdout stays machine-readable.
//!
//! # Example
//!
//! ```ignore
//! use tgsim_core::observability::{LogFormat, TracingConfig, init_tracing};
//!
//! let config = TracingConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("tgsim_client=debug")
//!     .build();
//! init_tracing(config)?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::init_tracing;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEnv;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(config.log_format(), LogFormat::Compact);
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::builder()
            .log_format(LogFormat::Json)
            .log_filter("debug")
            .include_location(true)
            .build();

        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.log_filter(), "debug");
        assert!(config.include_location());
        assert!(config.include_target());
    }

    #[test]
    fn test_config_from_env() {
        let env = MockEnv::from_pairs(&[
            ("TGSIM_LOG_FORMAT", "json"),
            ("RUST_LOG", "info"),
            ("TGSIM_LOG_LOCATION", "1"),
        ]);
        let config = TracingConfig::from_env(&env);

        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.log_filter(), "info");
        assert!(config.include_location());
    }

    #[test]
    fn test_log_level_beats_rust_log() {
        let env = MockEnv::from_pairs(&[
            ("TGSIM_LOG_FORMAT", "compact"),
            ("TGSIM_LOG_LEVEL", "tgsim_client=trace"),
            ("RUST_LOG", "info"),
        ]);
        assert_eq!(TracingConfig::from_env(&env).log_filter(), "tgsim_client=trace");
    }
}
