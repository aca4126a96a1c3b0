//! The thread store seam.

use async_trait::async_trait;

use crate::error::Result;

use super::types::ThreadMessage;

/// Append-only message log keyed by thread id.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Append one message to the end of the thread.
    async fn append(&self, thread_id: &str, message: &ThreadMessage) -> Result<()>;

    /// Read the whole thread in order. Unknown threads are empty.
    async fn load(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Remove the thread. Returns `false` when it did not exist.
    async fn delete(&self, thread_id: &str) -> Result<bool>;
}
