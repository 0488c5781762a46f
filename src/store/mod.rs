// src/store/mod.rs
// Transcript persistence - session metadata and the append-only event log

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod sqlite;

pub use sqlite::SqliteTranscriptStore;

/// Kind of transcript event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserMessage,
    AiResponse,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserMessage => "user_message",
            EventType::AiResponse => "ai_response",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user_message" => Some(EventType::UserMessage),
            "ai_response" => Some(EventType::AiResponse),
            _ => None,
        }
    }
}

/// One persisted transcript event
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_type: EventType,
    pub content: String,
    pub timestamp: i64,
}

/// Session metadata record. Open until the finalizer populates the
/// closing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub user_id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub session_summary: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// Durable store for session metadata and per-session transcript events
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Create the open metadata record for a new session.
    async fn insert_session(&self, session_id: &str, user_id: &str, start_time: i64)
    -> Result<()>;

    /// Append one event to the session's transcript.
    async fn append_event(
        &self,
        session_id: &str,
        event_type: EventType,
        content: &str,
    ) -> Result<()>;

    /// Populate the closing fields of a session's metadata record.
    /// A record that is already closed is left untouched.
    async fn update_session_close(
        &self,
        session_id: &str,
        end_time: i64,
        summary: &str,
        duration_seconds: i64,
    ) -> Result<()>;

    /// Fetch the session's full event history in timestamp order.
    async fn fetch_events(&self, session_id: &str) -> Result<Vec<EventRecord>>;

    /// Fetch a session's metadata record.
    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionMetadata>>;
}
