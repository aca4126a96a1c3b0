//! Session management endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use threadline_storage::Session;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::types::{
    CreateSessionRequest, DeleteSessionResponse, HistoryResponse, RenameSessionRequest,
    ResumeSessionResponse, SessionListResponse,
};

fn require_user(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    Ok(())
}

/// Create a new session bound to a fresh thread.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<Json<Session>> {
    require_user(&req.user_id)?;
    let session = state.sessions.create(&req.user_id, req.name).await?;
    Ok(Json(session))
}

/// The user's most recent session, created if they have none.
pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<Json<ResumeSessionResponse>> {
    require_user(&req.user_id)?;
    let (session, created) = state.sessions.resume_latest(&req.user_id, req.name).await?;
    Ok(Json(ResumeSessionResponse { session, created }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.sessions.get(&id).await?))
}

pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameSessionRequest>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.sessions.rename(&id, &req.name).await?))
}

/// Delete a session and request deletion of its history.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteSessionResponse>> {
    if !state.sessions.delete(&id).await? {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(DeleteSessionResponse {
        message: "Session deleted".to_string(),
        session_id: id,
    }))
}

/// All sessions of a user, most recently updated first.
pub async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<SessionListResponse>> {
    let sessions = state.sessions.list(&user_id).await?;
    Ok(Json(SessionListResponse { sessions }))
}

/// Displayed history of a session. Empty when nothing was said yet.
pub async fn get_session_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<HistoryResponse>> {
    let session = state.sessions.get(&id).await?;
    let messages = state.history.get_history(&session.thread_id).await;
    Ok(Json(HistoryResponse {
        session_id: session.session_id,
        thread_id: session.thread_id,
        messages,
    }))
}
