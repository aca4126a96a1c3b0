//! Model clients.
//!
//! A [`ModelClient`] turns a list of chat messages into a lazy stream of
//! text fragments. Dropping the stream stops generation.

mod echo;
mod openai;

pub use echo::EchoClient;
pub use openai::OpenAiClient;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use threadline_storage::{MessageOrigin, ThreadMessage};

use crate::error::{EngineError, Result};
use crate::settings::ModelSettings;

/// Stream of generated text pieces.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ThreadMessage> for ChatMessage {
    fn from(message: &ThreadMessage) -> Self {
        let role = match message.origin {
            MessageOrigin::Human => ChatRole::User,
            MessageOrigin::Ai => ChatRole::Assistant,
            MessageOrigin::System => ChatRole::System,
        };
        Self {
            role,
            content: message.content.clone(),
        }
    }
}

/// Trait for model clients.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Get the model name.
    fn model(&self) -> &str;

    /// Get the provider name.
    fn provider(&self) -> &str;

    /// Start a completion and return its fragments as they arrive.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream>;
}

/// Build the client named by `settings.provider`.
pub fn create_client(settings: &ModelSettings) -> Result<Arc<dyn ModelClient>> {
    match settings.provider.as_str() {
        "openai" => {
            if settings.api_key.is_none() {
                tracing::warn!(
                    base_url = %settings.base_url,
                    "No API key configured - requests will only succeed against open endpoints"
                );
            }
            Ok(Arc::new(OpenAiClient::from_settings(settings)?))
        }
        "echo" => Ok(Arc::new(EchoClient::new())),
        other => Err(EngineError::Configuration(format!(
            "unknown model provider: {other}"
        ))),
    }
}
