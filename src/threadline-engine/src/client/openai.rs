//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint that speaks `POST /chat/completions` with
//! `stream: true` and answers with server-sent events.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::{ChatMessage, FragmentStream, ModelClient};
use crate::error::{EngineError, Result};
use crate::settings::ModelSettings;

const USER_AGENT: &str = concat!("threadline/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming client for OpenAI-style chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    chunk_timeout: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

impl OpenAiClient {
    /// Create a client for `model` at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            temperature: 0.7,
            chunk_timeout: Duration::from_secs(60),
        })
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let mut client = Self::new(&settings.base_url, &settings.model)?
            .with_temperature(settings.temperature)
            .with_chunk_timeout(Duration::from_secs(settings.chunk_timeout_secs.max(1)));
        client.api_key = settings.api_key.clone();
        Ok(client)
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Abort the stream when no chunk arrives within `chunk_timeout`.
    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    async fn error_from_response(&self, resp: reqwest::Response) -> EngineError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                let preview: String = body.chars().take(200).collect();
                format!("HTTP {} from {}: {}", status, self.base_url, preview)
            });

        tracing::error!(status = %status, url = %self.base_url, "Chat completion request failed");
        EngineError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "openai"
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            stream: true,
        };

        tracing::debug!(url = %url, model = %self.model, messages = messages.len(), "Starting chat completion");

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }

        let chunk_timeout = self.chunk_timeout;
        let events = resp.bytes_stream().eventsource();

        let stream: FragmentStream = Box::pin(try_stream! {
            let mut events = std::pin::pin!(events);
            loop {
                let next = timeout(chunk_timeout, events.next()).await.map_err(|_| {
                    EngineError::Stream(format!(
                        "no data received for {} seconds",
                        chunk_timeout.as_secs()
                    ))
                })?;
                let Some(event) = next else {
                    break;
                };
                let event = event.map_err(|e| EngineError::Stream(e.to_string()))?;

                if event.data.is_empty() {
                    continue;
                }
                if event.data.trim() == "[DONE]" {
                    break;
                }

                let chunk: ChatCompletionChunk = serde_json::from_str(&event.data)
                    .map_err(|e| EngineError::Stream(format!("malformed chunk: {e}")))?;
                if let Some(error) = chunk.error {
                    Err::<(), _>(EngineError::Api { status: 200, message: error.message })?;
                }

                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        yield content;
                    }
                }
            }
        });
        Ok(stream)
    }
}
