//! Application state management.

use std::sync::Arc;
use std::time::{Duration, Instant};

use threadline_engine::{ConversationStateStore, ModelConversationStore, create_client};
use threadline_storage::{
    FileSessionStore, FileThreadStore, SessionStore, StoragePaths, StoragePool,
};
use tracing::info;

use crate::binding::SessionBinding;
use crate::config::ServerConfig;
use crate::coordinator::StreamingCoordinator;
use crate::error::AppResult;
use crate::history::HistoryProjection;

/// Application state shared across request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Shared storage handle. Closed on shutdown.
    pub pool: StoragePool,
    pub sessions: SessionBinding,
    pub history: HistoryProjection,
    pub coordinator: StreamingCoordinator,
    /// `provider/model` of the response generator, for `/health`.
    pub model_label: String,
    start_time: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("model", &self.model_label)
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl AppState {
    /// Open storage and build the model-backed generator from `config`.
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        let paths = match &config.storage.data_dir {
            Some(dir) => StoragePaths::from_root(dir.clone()),
            None => StoragePaths::new()?,
        };
        let pool = StoragePool::open(paths, config.storage.max_concurrent_ops).await?;

        let client = create_client(&config.model)?;
        let model_label = format!("{}/{}", client.provider(), client.model());
        let conversations = ModelConversationStore::new(
            client,
            Arc::new(FileThreadStore::new(pool.clone())),
        )
        .with_system_prompt(config.model.system_prompt.clone());

        let sessions = Arc::new(FileSessionStore::new(pool.clone()));

        info!(model = %model_label, "Response generator ready");
        Ok(Self::from_parts(
            config,
            pool,
            sessions,
            Arc::new(conversations),
            model_label,
        ))
    }

    /// Assemble state from already constructed collaborators.
    pub fn from_parts(
        config: ServerConfig,
        pool: StoragePool,
        sessions: Arc<dyn SessionStore>,
        conversations: Arc<dyn ConversationStateStore>,
        model_label: impl Into<String>,
    ) -> Self {
        let coordinator = StreamingCoordinator::new(
            Arc::clone(&conversations),
            config.streaming.coordinator_config(),
        );
        Self {
            sessions: SessionBinding::new(sessions, Arc::clone(&conversations)),
            history: HistoryProjection::new(conversations),
            coordinator,
            config,
            pool,
            model_label: model_label.into(),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
