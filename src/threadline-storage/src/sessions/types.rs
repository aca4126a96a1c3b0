//! Session record types.
//!
//! A session is a user-owned handle bound one-to-one to a conversation
//! thread. The binding is recorded once, at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: String,
    /// Thread bound to this session. Never reassigned.
    pub thread_id: String,
    /// Owning user.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last activity time. Never decreases.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Bump `updated_at` to now, or keep it if the clock went backwards.
    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }

    /// Change the display name and touch.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }
}

/// Input for creating a session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub user_id: String,
    /// Display name; a timestamped label is used when absent.
    pub name: Option<String>,
    /// Thread to bind; defaults to the generated session id.
    pub thread_id: Option<String>,
}

impl NewSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            thread_id: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Materialise the record with a fresh id and timestamps.
    pub fn into_session(self) -> Session {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        Session {
            thread_id: self.thread_id.unwrap_or_else(|| session_id.clone()),
            session_id,
            user_id: self.user_id,
            name: self.name.unwrap_or_else(|| default_session_name(now)),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Timestamped label used for unnamed sessions.
pub fn default_session_name(now: DateTime<Utc>) -> String {
    format!("Conversation {}", now.format("%d/%m/%Y %H:%M"))
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_new_session_binds_thread_to_id() {
        let session = NewSession::new("u1").into_session();
        assert_eq!(session.thread_id, session.session_id);
        assert_eq!(session.user_id, "u1");
        assert!(session.name.starts_with("Conversation "));
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_explicit_thread_binding() {
        let session = NewSession::new("u1")
            .with_thread_id("thread-7")
            .into_session();
        assert_eq!(session.thread_id, "thread-7");
        assert_ne!(session.session_id, "thread-7");
    }

    #[test]
    fn test_blank_name_falls_back_to_default() {
        let session = NewSession::new("u1")
            .with_name(Some("   ".to_string()))
            .into_session();
        assert!(session.name.starts_with("Conversation "));
    }

    #[test]
    fn test_default_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap();
        assert_eq!(default_session_name(at), "Conversation 05/03/2024 09:07");
    }

    #[test]
    fn test_touch_never_goes_backwards() {
        let mut session = NewSession::new("u1").into_session();
        let future = Utc::now() + Duration::hours(1);
        session.updated_at = future;
        session.touch();
        assert_eq!(session.updated_at, future);

        let before = session.updated_at;
        session.rename("renamed");
        assert!(session.updated_at >= before);
        assert_eq!(session.name, "renamed");
    }
}
