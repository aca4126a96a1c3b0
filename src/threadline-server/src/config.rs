//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use threadline_engine::ModelSettings;
use threadline_storage::DEFAULT_MAX_CONCURRENT_OPS;

use crate::coordinator::CoordinatorConfig;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Response generator settings.
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// CORS origins (empty = allow all).
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            storage: StorageConfig::default(),
            streaming: StreamingConfig::default(),
            model: ModelSettings::default(),
            logging: LoggingConfig::default(),
            cors_origins: vec![],
            max_body_size: default_max_body_size(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("THREADLINE_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(dir) = lookup("THREADLINE_DATA_DIR") {
            config.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(size) = lookup("THREADLINE_STORAGE_POOL_SIZE") {
            config.storage.max_concurrent_ops = parse_var("THREADLINE_STORAGE_POOL_SIZE", &size)?;
        }
        if let Some(secs) = lookup("THREADLINE_KEEPALIVE_SECS") {
            config.streaming.keepalive_interval_secs = parse_var("THREADLINE_KEEPALIVE_SECS", &secs)?;
        }
        if let Some(secs) = lookup("THREADLINE_READ_TIMEOUT_SECS") {
            config.streaming.read_timeout_secs = parse_var("THREADLINE_READ_TIMEOUT_SECS", &secs)?;
        }

        if let Some(provider) = lookup("THREADLINE_MODEL_PROVIDER") {
            config.model.provider = provider;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.model.model = model;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            config.model.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.model.base_url = url;
        }

        Ok(config)
    }

    /// Get shutdown timeout as Duration.
    pub fn shutdown_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {name}: {value:?}"))
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Uses the platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Storage operations allowed in flight.
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: usize,
}

fn default_max_concurrent_ops() -> usize {
    DEFAULT_MAX_CONCURRENT_OPS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_concurrent_ops: default_max_concurrent_ops(),
        }
    }
}

/// Streaming turn configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Idle seconds before a keepalive comment is written.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    /// Longest wait on the event queue before re-checking the turn.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Events buffered between the generator and the client.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_keepalive_interval() -> u64 {
    15
}

fn default_read_timeout() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: default_keepalive_interval(),
            read_timeout_secs: default_read_timeout(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl StreamingConfig {
    /// Coordinator timing. The read timeout never undercuts the keepalive interval.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let keepalive_secs = self.keepalive_interval_secs.max(1);
        CoordinatorConfig {
            keepalive_interval: Duration::from_secs(keepalive_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs.max(keepalive_secs)),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json or pretty).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}
