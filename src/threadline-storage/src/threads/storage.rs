//! File-backed thread store.
//!
//! One JSONL file per thread under `threads/`; each line is a
//! [`ThreadMessage`].

use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pool::StoragePool;

use super::store::ThreadStore;
use super::types::ThreadMessage;

#[derive(Debug, Clone)]
pub struct FileThreadStore {
    pool: StoragePool,
}

impl FileThreadStore {
    pub fn new(pool: StoragePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &StoragePool {
        &self.pool
    }
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn append(&self, thread_id: &str, message: &ThreadMessage) -> Result<()> {
        let path = self.pool.paths().thread_path(thread_id)?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.write_guard().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;

        debug!(thread_id = %thread_id, message_id = %message.id, "Message appended");
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let path = self.pool.paths().thread_path(thread_id)?;
        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.read_guard().await;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut messages = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ThreadMessage>(line) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!(thread_id = %thread_id, error = %e, "Failed to parse message line"),
            }
        }
        Ok(messages)
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        let path = self.pool.paths().thread_path(thread_id)?;
        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.write_guard().await;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(thread_id = %thread_id, "Thread deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
