//! Display-only view of a thread's persisted messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threadline_engine::ConversationStateStore;
use threadline_storage::MessageOrigin;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One displayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Reads history through the generator's store.
#[derive(Clone)]
pub struct HistoryProjection {
    conversations: Arc<dyn ConversationStateStore>,
}

impl HistoryProjection {
    pub fn new(conversations: Arc<dyn ConversationStateStore>) -> Self {
        Self { conversations }
    }

    /// Messages of `thread_id`, oldest first.
    ///
    /// Never fails: a missing thread and an unreadable one both yield an
    /// empty list.
    pub async fn get_history(&self, thread_id: &str) -> Vec<HistoryEntry> {
        let messages = match self.conversations.history(thread_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Failed to read history");
                return Vec::new();
            }
        };

        messages
            .into_iter()
            .filter_map(|message| {
                let role = match message.origin {
                    MessageOrigin::Human => Role::User,
                    MessageOrigin::System => return None,
                    MessageOrigin::Ai => Role::Assistant,
                };
                Some(HistoryEntry {
                    role,
                    content: message.content,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for HistoryProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryProjection").finish_non_exhaustive()
    }
}
