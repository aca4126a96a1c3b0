//! Model provider settings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Which model to call and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// `openai` for any OpenAI-compatible endpoint, `echo` for offline runs.
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: f32,
    /// Prepended to every request when set. Never persisted to the thread.
    pub system_prompt: Option<String>,
    /// Longest silence tolerated between two chunks of a streaming response.
    pub chunk_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            system_prompt: None,
            chunk_timeout_secs: 60,
        }
    }
}
