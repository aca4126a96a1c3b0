//! Thread message logs.
//!
//! Each thread is an append-only JSONL file. The log belongs to the response
//! generator; the rest of the system only reads it for display or deletes it
//! together with its session.

mod memory;
mod storage;
mod store;
mod types;

pub use memory::MemoryThreadStore;
pub use storage::FileThreadStore;
pub use store::ThreadStore;
pub use types::{MessageOrigin, ThreadMessage};
