//! Thread message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    /// Typed by the user.
    Human,
    /// Produced by the model.
    Ai,
    /// Injected instructions.
    System,
}

/// One entry of a thread log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub origin: MessageOrigin,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ThreadMessage {
    pub fn new(origin: MessageOrigin, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            origin,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageOrigin::System, content)
    }
}
