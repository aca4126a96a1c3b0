//! Shared test doubles.

use async_trait::async_trait;
use threadline_engine::{ConversationStateStore, EngineError, GeneratedStream, Result};
use threadline_storage::ThreadMessage;

/// Conversation store whose persistence is down.
pub(crate) struct FailingConversations;

#[async_trait]
impl ConversationStateStore for FailingConversations {
    async fn history(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Err(EngineError::Generation("history unavailable".to_string()))
    }

    fn generate(&self, _thread_id: &str, _message: &str) -> GeneratedStream {
        Box::pin(futures::stream::once(async {
            Err(EngineError::Generation("generator unavailable".to_string()))
        }))
    }

    async fn delete_thread(&self, _thread_id: &str) -> Result<bool> {
        Err(EngineError::Generation("delete unavailable".to_string()))
    }
}

/// Conversation store replaying a fixed generator script on every turn.
pub(crate) struct ScriptedConversations {
    make: Box<dyn Fn() -> GeneratedStream + Send + Sync>,
}

impl ScriptedConversations {
    pub(crate) fn new(make: impl Fn() -> GeneratedStream + Send + Sync + 'static) -> Self {
        Self {
            make: Box::new(make),
        }
    }
}

#[async_trait]
impl ConversationStateStore for ScriptedConversations {
    async fn history(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Ok(Vec::new())
    }

    fn generate(&self, _thread_id: &str, _message: &str) -> GeneratedStream {
        (self.make)()
    }

    async fn delete_thread(&self, _thread_id: &str) -> Result<bool> {
        Ok(false)
    }
}
