//! REST API routes and handlers.

mod health;
mod sessions;
#[cfg(test)]
mod tests;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub use types::{ConversationRequest, ConversationResponse, HealthResponse};

/// Create the API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        // Sessions
        .route("/conversation/session", post(sessions::create_session))
        .route(
            "/conversation/session/resume",
            post(sessions::resume_session),
        )
        .route(
            "/conversation/session/{id}",
            get(sessions::get_session)
                .patch(sessions::rename_session)
                .delete(sessions::delete_session),
        )
        .route(
            "/conversation/session/{id}/history",
            get(sessions::get_session_history),
        )
        .route(
            "/conversation/sessions/user/{user_id}",
            get(sessions::list_user_sessions),
        )
}
