//! Shared storage handle.
//!
//! A [`StoragePool`] is constructed once at process start and cloned into
//! every component that persists something. All clones share the same
//! operation permits and the same record write lock.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::paths::StoragePaths;

/// Default number of storage operations allowed in flight.
pub const DEFAULT_MAX_CONCURRENT_OPS: usize = 100;

/// Explicitly constructed, shared-ownership storage handle.
#[derive(Debug, Clone)]
pub struct StoragePool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    paths: StoragePaths,
    permits: Semaphore,
    max_concurrent_ops: usize,
    /// Writers hold it exclusively. Readers of append-only logs share it.
    record_lock: RwLock<()>,
}

impl StoragePool {
    /// Create the directory layout and return a ready pool.
    pub async fn open(paths: StoragePaths, max_concurrent_ops: usize) -> Result<Self> {
        paths.ensure_dirs().await?;
        let max_concurrent_ops = max_concurrent_ops.max(1);
        info!(
            data_dir = %paths.data_dir.display(),
            max_concurrent_ops,
            "Storage pool opened"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                paths,
                permits: Semaphore::new(max_concurrent_ops),
                max_concurrent_ops,
                record_lock: RwLock::new(()),
            }),
        })
    }

    /// Open a pool at the platform default location.
    pub async fn open_default() -> Result<Self> {
        Self::open(StoragePaths::new()?, DEFAULT_MAX_CONCURRENT_OPS).await
    }

    /// Get the underlying paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.inner.paths
    }

    /// Check out one operation slot. Fails once the pool is closed.
    pub async fn checkout(&self) -> Result<SemaphorePermit<'_>> {
        self.inner
            .permits
            .acquire()
            .await
            .map_err(|_| StorageError::Closed)
    }

    /// Acquire the record lock exclusively, for read-modify-write cycles and appends.
    pub(crate) async fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.record_lock.write().await
    }

    /// Acquire the record lock shared, for reads that must not observe a partial append.
    pub(crate) async fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.record_lock.read().await
    }

    /// Verify the data directory is reachable.
    pub async fn ping(&self) -> Result<()> {
        let _permit = self.checkout().await?;
        let meta = tokio::fs::metadata(&self.inner.paths.data_dir).await?;
        if !meta.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "data directory is not a directory",
            )));
        }
        Ok(())
    }

    /// Number of operation slots currently free.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Configured number of operation slots.
    pub fn capacity(&self) -> usize {
        self.inner.max_concurrent_ops
    }

    /// Refuse new checkouts. Operations already holding a slot finish normally.
    pub fn close(&self) {
        if !self.inner.permits.is_closed() {
            self.inner.permits.close();
            info!("Storage pool closed");
        } else {
            debug!("Storage pool already closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_layout() {
        let dir = tempdir().unwrap();
        let paths = StoragePaths::from_root(dir.path().join("data"));
        let pool = StoragePool::open(paths.clone(), 4).await.unwrap();

        assert!(paths.sessions_dir.is_dir());
        assert!(paths.threads_dir.is_dir());
        assert_eq!(pool.capacity(), 4);
        pool.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_permits() {
        let dir = tempdir().unwrap();
        let pool = StoragePool::open(StoragePaths::from_root(dir.path().to_path_buf()), 2)
            .await
            .unwrap();
        let other = pool.clone();

        let _permit = pool.checkout().await.unwrap();
        assert_eq!(other.available(), 1);
    }

    #[tokio::test]
    async fn test_close_rejects_checkout() {
        let dir = tempdir().unwrap();
        let pool = StoragePool::open(StoragePaths::from_root(dir.path().to_path_buf()), 0)
            .await
            .unwrap();
        assert_eq!(pool.capacity(), 1);

        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.checkout().await, Err(StorageError::Closed)));
        assert!(pool.ping().await.is_err());
    }
}
