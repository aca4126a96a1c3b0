//! Event sinks.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event::{SinkItem, StreamEvent};

/// The receiving side is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink disconnected")]
pub struct Disconnected;

/// Where a turn's events are delivered.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one item, in order.
    async fn send(&self, item: SinkItem) -> Result<(), Disconnected>;

    /// Resolves once the receiver has disconnected.
    async fn closed(&self);
}

#[async_trait]
impl EventSink for mpsc::Sender<SinkItem> {
    async fn send(&self, item: SinkItem) -> Result<(), Disconnected> {
        mpsc::Sender::send(self, item).await.map_err(|_| Disconnected)
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// Buffers everything it receives. Never disconnects.
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Mutex<Vec<SinkItem>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, keepalives included.
    pub fn items(&self) -> Vec<SinkItem> {
        self.lock().clone()
    }

    /// Logical events only.
    pub fn events(&self) -> Vec<StreamEvent> {
        self.lock()
            .iter()
            .filter_map(|item| item.as_event().cloned())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkItem>> {
        // A poisoned buffer is still a valid list of items.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn send(&self, item: SinkItem) -> Result<(), Disconnected> {
        self.lock().push(item);
        Ok(())
    }

    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}
