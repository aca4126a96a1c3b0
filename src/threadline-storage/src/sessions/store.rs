//! The session store seam.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{NewSession, Session};

/// Persistence for session records.
///
/// Lookups of unknown ids fail with [`StorageError::SessionNotFound`];
/// malformed ids fail with [`StorageError::InvalidId`]. Both satisfy
/// [`StorageError::is_not_found`].
///
/// [`StorageError::SessionNotFound`]: crate::StorageError::SessionNotFound
/// [`StorageError::InvalidId`]: crate::StorageError::InvalidId
/// [`StorageError::is_not_found`]: crate::StorageError::is_not_found
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session.
    async fn create(&self, new: NewSession) -> Result<Session>;

    /// Get a session by id.
    async fn get(&self, session_id: &str) -> Result<Session>;

    /// Get the session bound to a thread.
    async fn get_by_thread(&self, thread_id: &str) -> Result<Session>;

    /// List a user's sessions, most recently updated first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>>;

    /// Set `updated_at` to now (never lowering it).
    async fn touch(&self, session_id: &str) -> Result<Session>;

    /// Change the display name.
    async fn rename(&self, session_id: &str, name: &str) -> Result<Session>;

    /// Remove a session. Returns `false` when it did not exist.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

pub(crate) fn sort_recent_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
