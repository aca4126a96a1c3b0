//! Conversation store backed by a model client and a thread log.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use threadline_storage::{ThreadMessage, ThreadStore};
use tracing::{debug, info};

use crate::client::{ChatMessage, ModelClient};
use crate::error::Result;
use crate::store::{ConversationStateStore, Generated, GeneratedStream};

/// Streams model output and records each completed turn in a [`ThreadStore`].
///
/// The human message is appended before the model is called. The AI reply
/// is appended only when the model stream finishes cleanly, so a failed or
/// abandoned turn leaves just the question behind.
#[derive(Clone)]
pub struct ModelConversationStore {
    client: Arc<dyn ModelClient>,
    threads: Arc<dyn ThreadStore>,
    system_prompt: Option<String>,
}

impl ModelConversationStore {
    pub fn new(client: Arc<dyn ModelClient>, threads: Arc<dyn ThreadStore>) -> Self {
        Self {
            client,
            threads,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn client(&self) -> &Arc<dyn ModelClient> {
        &self.client
    }
}

impl std::fmt::Debug for ModelConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConversationStore")
            .field("provider", &self.client.provider())
            .field("model", &self.client.model())
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

#[async_trait]
impl ConversationStateStore for ModelConversationStore {
    async fn history(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Ok(self.threads.load(thread_id).await?)
    }

    fn generate(&self, thread_id: &str, message: &str) -> GeneratedStream {
        let client = Arc::clone(&self.client);
        let threads = Arc::clone(&self.threads);
        let system_prompt = self.system_prompt.clone();
        let thread_id = thread_id.to_string();
        let message = message.to_string();

        Box::pin(try_stream! {
            let prior = threads.load(&thread_id).await?;
            threads.append(&thread_id, &ThreadMessage::human(message.as_str())).await?;

            let mut request = Vec::with_capacity(prior.len() + 2);
            if let Some(prompt) = &system_prompt {
                request.push(ChatMessage::system(prompt.as_str()));
            }
            request.extend(prior.iter().map(ChatMessage::from));
            request.push(ChatMessage::user(message.as_str()));

            debug!(thread_id = %thread_id, history = prior.len(), "Generating response");
            let mut fragments = client.stream_chat(request).await?;
            let mut full_text = String::new();
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                full_text.push_str(&fragment);
                yield Generated::Fragment(fragment);
            }

            threads.append(&thread_id, &ThreadMessage::ai(full_text.as_str())).await?;
            info!(thread_id = %thread_id, chars = full_text.len(), "Turn persisted");
        })
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.delete(thread_id).await?)
    }
}
