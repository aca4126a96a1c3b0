//! In-memory thread store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::paths::validate_id;

use super::store::ThreadStore;
use super::types::ThreadMessage;

#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<String, Vec<ThreadMessage>>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn append(&self, thread_id: &str, message: &ThreadMessage) -> Result<()> {
        validate_id(thread_id)?;
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        validate_id(thread_id)?;
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }
}
