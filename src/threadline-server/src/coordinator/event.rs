//! Turn input, logical events and outcomes.

use serde::Serialize;

/// One user message submitted to a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub thread_id: String,
    pub message: String,
    /// Announced as the first event when set.
    pub session: Option<TurnSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSession {
    pub session_id: String,
    pub user_id: String,
}

impl Turn {
    pub fn new(thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            message: message.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.session = Some(TurnSession {
            session_id: session_id.into(),
            user_id: user_id.into(),
        });
        self
    }
}

/// Logical events of a turn, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Session {
        session_id: String,
        thread_id: String,
        user_id: String,
    },
    Fragment {
        text: String,
    },
    Done {
        full_text: String,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    /// `Done` and `Error` end a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// What travels through the turn queue and into a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkItem {
    Event(StreamEvent),
    /// Transport-only idle marker.
    Keepalive,
}

impl SinkItem {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Event(event) if event.is_terminal())
    }

    pub fn as_event(&self) -> Option<&StreamEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Keepalive => None,
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { full_text: String },
    Failed { message: String },
    /// The client went away before the terminal event was delivered.
    Disconnected,
}
