//! Shared library for the AniDB client workspace.
//!
//! This crate provides common functionality used by the client library and
//! the command-line tool:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{AnidbConfig, Config, LoggingConfig};
pub use logging::LogConfig;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
