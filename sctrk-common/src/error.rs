//! Common error types for SCTRK

use thiserror::Error;

/// Common result type for SCTRK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by SCTRK crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
