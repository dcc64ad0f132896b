//! Error types for gigboard-agg
//!
//! Transient failures (a venue feed timing out, a metadata lookup failing)
//! are absorbed inside the pipeline. Only failures to read or write the
//! persisted state reach callers as `AggError`.

use thiserror::Error;

/// Aggregator error type
#[derive(Debug, Error)]
pub enum AggError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// gigboard-common error (persistence, config)
    #[error("Common error: {0}")]
    Common(#[from] gigboard_common::Error),
}

/// Result type for aggregator operations
pub type AggResult<T> = Result<T, AggError>;
