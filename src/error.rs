//! Error types for tracesql.
//!
//! Generation itself never fails: problems with the SQL or the EXEC text
//! become warnings. These errors cover the surface around it (config files,
//! I/O in the binary).

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for tracesql operations.
#[derive(Debug, Error)]
pub enum TraceError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraceError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for tracesql operations.
pub type TraceResult<T> = Result<T, TraceError>;
