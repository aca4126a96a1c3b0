//! Threadline Engine - response generation.
//!
//! The server talks to this crate through [`ConversationStateStore`]: it asks
//! for a thread's history, submits a message with
//! [`generate`](ConversationStateStore::generate) and consumes the lazy
//! stream of [`Generated`] items. [`ModelConversationStore`] implements that
//! seam on top of a [`ModelClient`] and a thread log.

pub mod client;
pub mod conversation;
pub mod error;
pub mod settings;
pub mod store;

pub use client::{
    ChatMessage, ChatRole, EchoClient, FragmentStream, ModelClient, OpenAiClient, create_client,
};
pub use conversation::ModelConversationStore;
pub use error::{EngineError, Result};
pub use settings::ModelSettings;
pub use store::{ConversationStateStore, Generated, GeneratedStream};
