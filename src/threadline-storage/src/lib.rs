//! Threadline Storage - session records and thread message logs.
//!
//! Everything lives under one data directory:
//!
//! - `sessions/<session_id>.json` - one record per session
//! - `threads/<thread_id>.jsonl` - append-only message log per thread
//!
//! A single [`StoragePool`] is opened at startup and shared by every store.
//!
//! # Usage
//!
//! ```rust,no_run
//! use threadline_storage::{
//!     FileSessionStore, FileThreadStore, NewSession, SessionStore, StoragePool, ThreadMessage,
//!     ThreadStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> threadline_storage::Result<()> {
//!     let pool = StoragePool::open_default().await?;
//!     let sessions = FileSessionStore::new(pool.clone());
//!     let threads = FileThreadStore::new(pool.clone());
//!
//!     let session = sessions.create(NewSession::new("user-1")).await?;
//!     threads
//!         .append(&session.thread_id, &ThreadMessage::human("Hello!"))
//!         .await?;
//!
//!     let listed = sessions.list_for_user("user-1").await?;
//!     println!("Found {} sessions", listed.len());
//!
//!     pool.close();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod paths;
pub mod pool;
pub mod sessions;
pub mod threads;

// Re-export main types at crate root
pub use error::{Result, StorageError};
pub use paths::{StoragePaths, threadline_data_dir, validate_id};
pub use pool::{DEFAULT_MAX_CONCURRENT_OPS, StoragePool};
pub use sessions::{
    FileSessionStore, MemorySessionStore, NewSession, Session, SessionStore, default_session_name,
};
pub use threads::{FileThreadStore, MemoryThreadStore, MessageOrigin, ThreadMessage, ThreadStore};
