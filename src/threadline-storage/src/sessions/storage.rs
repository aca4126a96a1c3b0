//! File-backed session store.
//!
//! One pretty-printed JSON document per session under `sessions/`.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::pool::StoragePool;

use super::store::{SessionStore, sort_recent_first};
use super::types::{NewSession, Session};

/// Session store writing JSON records through a [`StoragePool`].
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    pool: StoragePool,
}

impl FileSessionStore {
    pub fn new(pool: StoragePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &StoragePool {
        &self.pool
    }

    async fn read_record(&self, session_id: &str) -> Result<Session> {
        let path = self.pool.paths().session_path(session_id)?;
        match load_session_from_path(&path).await {
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::SessionNotFound(session_id.to_string()))
            }
            other => other,
        }
    }

    /// Write a record atomically: a temp file is fsynced, then renamed over
    /// the target, then (on Unix) the directory is fsynced. Readers see either
    /// the old record or the new one, never a partial file.
    async fn write_record(&self, session: &Session) -> Result<()> {
        let path = self.pool.paths().session_path(&session.session_id)?;
        let tmp_path = path.with_file_name(format!(".{}.json.tmp", session.session_id));
        let content = serde_json::to_string_pretty(session)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        #[cfg(unix)]
        {
            if let Some(parent) = path.parent() {
                if let Ok(dir) = fs::File::open(parent).await {
                    let _ = dir.sync_all().await;
                }
            }
        }

        debug!(session_id = %session.session_id, "Session saved");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let dir = &self.pool.paths().sessions_dir;
        if !dir.exists() {
            return Ok(sessions);
        }

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                match load_session_from_path(&path).await {
                    Ok(session) => sessions.push(session),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to load session"),
                }
            }
        }
        Ok(sessions)
    }

    async fn update(&self, session_id: &str, apply: impl FnOnce(&mut Session) + Send) -> Result<Session> {
        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.write_guard().await;
        let mut session = self.read_record(session_id).await?;
        apply(&mut session);
        self.write_record(&session).await?;
        Ok(session)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, new: NewSession) -> Result<Session> {
        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.write_guard().await;

        if let Some(thread_id) = &new.thread_id {
            self.pool.paths().thread_path(thread_id)?;
            if self.read_all().await?.iter().any(|s| &s.thread_id == thread_id) {
                return Err(StorageError::ThreadAlreadyBound(thread_id.clone()));
            }
        }

        let mut session = new.clone().into_session();
        while self.pool.paths().session_path(&session.session_id)?.exists() {
            session = new.clone().into_session();
        }

        self.write_record(&session).await?;
        info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "Session created"
        );
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Session> {
        let _permit = self.pool.checkout().await?;
        self.read_record(session_id).await
    }

    async fn get_by_thread(&self, thread_id: &str) -> Result<Session> {
        let _permit = self.pool.checkout().await?;
        self.read_all()
            .await?
            .into_iter()
            .find(|s| s.thread_id == thread_id)
            .ok_or_else(|| StorageError::SessionNotFound(thread_id.to_string()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let _permit = self.pool.checkout().await?;
        let mut sessions: Vec<_> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|s| s.user_id == user_id)
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
        let _permit = self.pool.checkout().await?;
        let _guard = self.pool.write_guard().await;
        let path = self.pool.paths().session_path(session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(session_id = %session_id, "Session deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn load_session_from_path(path: &Path) -> Result<Session> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}
