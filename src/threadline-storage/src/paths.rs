//! OS-aware path detection for threadline storage.
//!
//! The data directory resolves to:
//!
//! - **Windows**: `%APPDATA%\Threadline\`
//! - **macOS**: `~/Library/Application Support/Threadline/`
//! - **Linux**: `~/.local/share/Threadline/`
//!
//! `THREADLINE_DATA_DIR` overrides the platform default. When running in a
//! read-only container, mount that directory as a writable volume.

use std::path::PathBuf;
use tracing::debug;

use crate::error::{Result, StorageError};

/// Application name used for storage directories.
pub const APP_NAME: &str = "Threadline";

/// Subdirectory names.
pub const SESSIONS_DIR: &str = "sessions";
pub const THREADS_DIR: &str = "threads";

/// Longest identifier accepted as a file stem.
const MAX_ID_LEN: usize = 128;

/// Threadline storage paths container.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Session records directory.
    pub sessions_dir: PathBuf,
    /// Thread message logs directory.
    pub threads_dir: PathBuf,
}

impl StoragePaths {
    /// Create paths with automatic OS detection.
    pub fn new() -> Result<Self> {
        let data_dir = threadline_data_dir()?;
        Ok(Self::from_root(data_dir))
    }

    /// Create paths from a custom root directory.
    pub fn from_root(data_dir: PathBuf) -> Self {
        Self {
            sessions_dir: data_dir.join(SESSIONS_DIR),
            threads_dir: data_dir.join(THREADS_DIR),
            data_dir,
        }
    }

    /// Ensure all directories exist.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(&self.sessions_dir).await?;
        tokio::fs::create_dir_all(&self.threads_dir).await?;
        debug!(data_dir = %self.data_dir.display(), "Storage directories initialized");
        Ok(())
    }

    /// Get path for a session record.
    pub fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_id(session_id)?;
        Ok(self.sessions_dir.join(format!("{session_id}.json")))
    }

    /// Get path for a thread message log.
    pub fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        validate_id(thread_id)?;
        Ok(self.threads_dir.join(format!("{thread_id}.jsonl")))
    }
}

/// Reject identifiers that could escape the storage directory.
///
/// Only ASCII alphanumerics, `-` and `_` are allowed.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Get the threadline data directory based on the current OS.
pub fn threadline_data_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("THREADLINE_DATA_DIR") {
        if !val.is_empty() {
            let path = PathBuf::from(val);
            debug!(path = %path.display(), "Using THREADLINE_DATA_DIR override");
            return Ok(path);
        }
    }

    let base = dirs::data_dir().ok_or(StorageError::HomeDirNotFound)?;
    Ok(base.join(APP_NAME))
}
