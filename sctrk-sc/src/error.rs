//! Error types for sctrk-sc
//!
//! Crate-level errors for lifecycle, configuration and the HTTP surface.
//! Collaborator failures are `BridgeError`s and stay local to the operation
//! that raised them.

use thiserror::Error;

/// Main error type for sctrk-sc
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sctrk_common::Error> for Error {
    fn from(e: sctrk_common::Error) -> Self {
        match e {
            sctrk_common::Error::Io(io) => Error::Io(io),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using sctrk-sc Error
pub type Result<T> = std::result::Result<T, Error>;
