//! Error types for threadline-storage.

use thiserror::Error;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Another session already owns this thread.
    #[error("Thread already bound to a session: {0}")]
    ThreadAlreadyBound(String),

    /// Identifier that cannot be used as a storage key.
    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    /// Home directory not found.
    #[error("Could not determine home/data directory")]
    HomeDirNotFound,

    /// The pool was closed during shutdown.
    #[error("Storage pool is closed")]
    Closed,
}

impl StorageError {
    /// Whether this error means "no such record" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::InvalidId(_))
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
