//! In-memory session store for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, StorageError};
use crate::paths::validate_id;

use super::store::{SessionStore, sort_recent_first};
use super::types::{NewSession, Session};

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn update(&self, session_id: &str, apply: impl FnOnce(&mut Session) + Send) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        apply(session);
        Ok(session.clone())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, new: NewSession) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(thread_id) = &new.thread_id {
            validate_id(thread_id)?;
            if sessions.values().any(|s| &s.thread_id == thread_id) {
                return Err(StorageError::ThreadAlreadyBound(thread_id.clone()));
            }
        }

        let mut session = new.clone().into_session();
        while sessions.contains_key(&session.session_id) {
            session = new.clone().into_session();
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))
    }

    async fn get_by_thread(&self, thread_id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .values()
            .find(|s| s.thread_id == thread_id)
            .cloned()
            .ok_or_else(|| StorageError::SessionNotFound(thread_id.to_string()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sort_recent_first(&mut sessions);
        Ok(sessions)
    }

    async fn touch(&self, session_id: &str) -> Result<Session> {
        self.update(session_id, Session::touch).await
    }

    async fn rename(&self, session_id: &str, name: &str) -> Result<Session> {
        let name = name.to_string();
        self.update(session_id, move |s| s.rename(name)).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}
