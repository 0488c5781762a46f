// src/session/mod.rs
// Session lifecycle: one live connection's state, context, and turn loop

pub mod finalizer;
pub mod relay;

pub use finalizer::Finalizer;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ws::message::WsServerMessage;
use crate::llm::provider::{LlmProvider, Message};
use crate::store::{EventType, TranscriptStore};

/// System message seeding every new conversation context.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

pub(crate) fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Lifecycle state of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Disconnected,
    Finalized,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Finalized => "finalized",
        }
    }
}

/// Owns one connection's conversation state and drives its turns.
///
/// The context is mutated only through `on_message`, which the socket loop
/// calls strictly sequentially; nothing else touches it.
pub struct Session {
    id: String,
    client_id: String,
    started_at: i64,
    context: Vec<Message>,
    status: SessionStatus,
    store: Arc<dyn TranscriptStore>,
    llm: Arc<dyn LlmProvider>,
    ws_tx: mpsc::Sender<WsServerMessage>,
}

impl Session {
    /// Open a new session for a connected client. The open metadata record is
    /// persisted immediately; a store failure is logged without refusing the
    /// connection.
    pub async fn create(
        client_id: String,
        store: Arc<dyn TranscriptStore>,
        llm: Arc<dyn LlmProvider>,
        ws_tx: mpsc::Sender<WsServerMessage>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let started_at = now_timestamp();

        if let Err(e) = store.insert_session(&id, &client_id, started_at).await {
            warn!(session_id = %id, error = %e, "Failed to persist session metadata");
        }

        info!(session_id = %id, client_id = %client_id, "Session created");

        Session {
            id,
            client_id,
            started_at,
            context: vec![Message::system(SYSTEM_PROMPT)],
            status: SessionStatus::Active,
            store,
            llm,
            ws_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn context(&self) -> &[Message] {
        &self.context
    }

    /// Handle one inbound user message: log it, grow the context, and run a
    /// generation turn. Returns `Err` only when the outbound channel is gone,
    /// which ends the connection.
    pub async fn on_message(&mut self, text: String) -> Result<()> {
        debug!(session_id = %self.id, content_len = text.len(), "Received user message");

        if let Err(e) = self
            .store
            .append_event(&self.id, EventType::UserMessage, &text)
            .await
        {
            warn!(session_id = %self.id, error = %e, "Failed to log user message");
        }
        self.context.push(Message::user(text));

        relay::run_turn(
            &*self.llm,
            &*self.store,
            &self.id,
            &mut self.context,
            &self.ws_tx,
        )
        .await
    }

    /// Handle the terminal disconnect: flip the status and schedule
    /// finalization as a detached task. Redelivered disconnects are ignored,
    /// so the finalizer is spawned at most once per session.
    pub fn on_disconnect(&mut self) -> Option<JoinHandle<()>> {
        if self.status != SessionStatus::Active {
            debug!(session_id = %self.id, status = %self.status.as_str(), "Duplicate disconnect ignored");
            return None;
        }
        self.status = SessionStatus::Disconnected;

        info!(
            session_id = %self.id,
            client_id = %self.client_id,
            "Client disconnected, scheduling finalization"
        );

        let finalizer = Finalizer::new(self.store.clone(), self.llm.clone());
        Some(finalizer.spawn(self.id.clone(), self.started_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(SessionStatus::Active.as_str(), "active");
        assert_eq!(SessionStatus::Disconnected.as_str(), "disconnected");
        assert_eq!(SessionStatus::Finalized.as_str(), "finalized");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::Disconnected).unwrap();
        assert_eq!(json, r#""disconnected""#);
        let parsed: SessionStatus = serde_json::from_str(r#""finalized""#).unwrap();
        assert_eq!(parsed, SessionStatus::Finalized);
    }
}
