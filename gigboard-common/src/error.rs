//! Common error types for Gigboard

use thiserror::Error;

/// Common result type for Gigboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Gigboard crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error on persisted state
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or persisted value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
