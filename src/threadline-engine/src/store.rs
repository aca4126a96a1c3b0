//! The conversation state seam consumed by the server.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use threadline_storage::ThreadMessage;

use crate::error::Result;

/// One item produced while answering a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// Incremental text.
    Fragment(String),
    /// The whole response at once. Ends generation.
    Final(String),
}

/// Lazy stream of generation output. Nothing happens until it is polled.
pub type GeneratedStream = Pin<Box<dyn Stream<Item = Result<Generated>> + Send>>;

/// Owner of persisted conversation history and of response generation.
///
/// Calling [`generate`](Self::generate) submits the message; implementations
/// persist the turn as a side effect of driving the stream to completion.
#[async_trait]
pub trait ConversationStateStore: Send + Sync {
    /// Persisted messages of a thread, oldest first.
    async fn history(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Answer `message` in `thread_id`.
    fn generate(&self, thread_id: &str, message: &str) -> GeneratedStream;

    /// Drop the thread's persisted history. Returns `false` when there was none.
    async fn delete_thread(&self, thread_id: &str) -> Result<bool>;
}
