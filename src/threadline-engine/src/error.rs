//! Error types for threadline-engine.

use thiserror::Error;
use threadline_storage::StorageError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while generating a response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error payload or a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported verbatim by a generator.
    #[error("{0}")]
    Generation(String),

    #[error("Generation cancelled")]
    Cancelled,
}
