//! Session/thread binding.
//!
//! A session is the user-facing handle of exactly one thread. The binding is
//! recorded once, at creation, and read back everywhere else.

use std::sync::Arc;

use threadline_engine::ConversationStateStore;
use threadline_storage::{NewSession, Session, SessionStore};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Session lifecycle on top of a [`SessionStore`].
#[derive(Clone)]
pub struct SessionBinding {
    sessions: Arc<dyn SessionStore>,
    conversations: Arc<dyn ConversationStateStore>,
}

impl std::fmt::Debug for SessionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinding").finish_non_exhaustive()
    }
}

impl SessionBinding {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        conversations: Arc<dyn ConversationStateStore>,
    ) -> Self {
        Self {
            sessions,
            conversations,
        }
    }

    /// Create a session bound to a fresh thread. Blank names get a timestamped default.
    pub async fn create(&self, user_id: &str, name: Option<String>) -> AppResult<Session> {
        let session = self
            .sessions
            .create(NewSession::new(user_id).with_name(name))
            .await?;
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> AppResult<Session> {
        Ok(self.sessions.get(session_id).await?)
    }

    pub async fn get_by_thread(&self, thread_id: &str) -> AppResult<Session> {
        Ok(self.sessions.get_by_thread(thread_id).await?)
    }

    /// A user's sessions, most recently updated first.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<Session>> {
        Ok(self.sessions.list_for_user(user_id).await?)
    }

    pub async fn touch(&self, session_id: &str) -> AppResult<Session> {
        Ok(self.sessions.touch(session_id).await?)
    }

    pub async fn rename(&self, session_id: &str, name: &str) -> AppResult<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        Ok(self.sessions.rename(session_id, name).await?)
    }

    /// Remove a session, then ask the generator to drop its history.
    ///
    /// History deletion is best effort: failures are logged and the session
    /// stays deleted.
    pub async fn delete(&self, session_id: &str) -> AppResult<bool> {
        let session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if !self.sessions.delete(session_id).await? {
            return Ok(false);
        }

        match self.conversations.delete_thread(&session.thread_id).await {
            Ok(_) => {}
            Err(e) => warn!(
                session_id = %session_id,
                thread_id = %session.thread_id,
                error = %e,
                "Failed to delete thread history"
            ),
        }

        info!(session_id = %session_id, "Session deleted");
        Ok(true)
    }

    /// Session to run a turn in: an existing one owned by `user_id`, or a new one.
    ///
    /// Returns the session and whether it was created. An existing session is
    /// touched so it sorts first in the user's list.
    pub async fn resolve_for_turn(
        &self,
        session_id: Option<&str>,
        user_id: &str,
        name: Option<String>,
    ) -> AppResult<(Session, bool)> {
        match session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let session = self.sessions.get(id).await?;
                if session.user_id != user_id {
                    return Err(AppError::NotFound(format!("Session not found: {id}")));
                }
                Ok((self.sessions.touch(id).await?, false))
            }
            None => Ok((self.create(user_id, name).await?, true)),
        }
    }

    /// The user's most recent session, or a new one when they have none.
    pub async fn resume_latest(&self, user_id: &str, name: Option<String>) -> AppResult<(Session, bool)> {
        match self.sessions.list_for_user(user_id).await?.into_iter().next() {
            Some(latest) => Ok((self.sessions.touch(&latest.session_id).await?, false)),
            None => Ok((self.create(user_id, name).await?, true)),
        }
    }
}
