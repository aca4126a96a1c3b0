//! Offline client that repeats the last user message back.

use async_trait::async_trait;
use futures::stream;

use super::{ChatMessage, ChatRole, FragmentStream, ModelClient};
use crate::error::Result;

/// Replies with the last user message, one word per fragment.
#[derive(Debug, Clone, Default)]
pub struct EchoClient;

impl EchoClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelClient for EchoClient {
    fn model(&self) -> &str {
        "echo"
    }

    fn provider(&self) -> &str {
        "echo"
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream> {
        let reply = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let fragments: Vec<Result<String>> = reply
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(fragments)))
    }
}
