//! API request and response types.

use serde::{Deserialize, Serialize};
use threadline_storage::Session;

use crate::history::HistoryEntry;

// ============================================================================
// Service
// ============================================================================

/// Service banner returned by `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// `connected`, or `error: <reason>` when the data directory is unreachable.
    pub storage: String,
    /// `provider/model` of the response generator.
    pub model: String,
}

// ============================================================================
// Conversation
// ============================================================================

fn default_stream() -> bool {
    true
}

/// Body of `POST /conversation`.
///
/// Missing strings deserialize as empty so they are reported as validation
/// errors by the handler rather than as a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    /// Name for the session if one gets created.
    #[serde(default, alias = "name")]
    pub session_name: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

/// Non-streaming turn result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub session_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameSessionRequest {
    #[serde(default)]
    pub name: String,
}

/// A session plus whether this request created it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeSessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSessionResponse {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub thread_id: String,
    pub messages: Vec<HistoryEntry>,
}
