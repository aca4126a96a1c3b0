//! Session records.
//!
//! - [`types`] - `Session` and `NewSession`
//! - [`store`] - the `SessionStore` trait
//! - [`storage`] - JSON-file implementation
//! - [`memory`] - in-memory implementation

mod memory;
mod storage;
mod store;
#[cfg(test)]
mod tests;
mod types;

pub use memory::MemorySessionStore;
pub use storage::FileSessionStore;
pub use store::SessionStore;
pub use types::{NewSession, Session, default_session_name};
