// src/session/finalizer.rs
// Post-session summarization, detached from the connection path

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::now_timestamp;
use crate::llm::provider::LlmProvider;
use crate::store::{EventRecord, TranscriptStore};

/// Summary written when generation fails; the record still closes.
pub const SUMMARY_FALLBACK: &str = "Summary generation failed.";

/// Closes a session's metadata record with a generated transcript summary.
/// Holds its own collaborator handles and needs nothing from the live
/// session beyond its id and start time.
pub struct Finalizer {
    store: Arc<dyn TranscriptStore>,
    llm: Arc<dyn LlmProvider>,
}

impl Finalizer {
    pub fn new(store: Arc<dyn TranscriptStore>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { store, llm }
    }

    /// Run finalization as a detached task. Failures are logged and dropped;
    /// the connection path is never blocked on this work.
    pub fn spawn(self, session_id: String, started_at: i64) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(&session_id, started_at).await {
                warn!(session_id = %session_id, error = %e, "Session finalization failed");
            }
        })
    }

    /// Summarize the transcript and close the session metadata record.
    pub async fn run(&self, session_id: &str, started_at: i64) -> Result<()> {
        info!(session_id = %session_id, "Running post-session analysis");

        let events = self.store.fetch_events(session_id).await?;
        let transcript = render_transcript(&events);

        let summary = match self.llm.generate_once(summary_prompt(&transcript)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Summary generation failed, using fallback");
                SUMMARY_FALLBACK.to_string()
            }
        };

        let now = now_timestamp();
        let duration_seconds = (now - started_at).max(0);

        self.store
            .update_session_close(session_id, now, &summary, duration_seconds)
            .await?;

        let end_time = chrono::DateTime::from_timestamp(now, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| now.to_string());

        info!(
            session_id = %session_id,
            events = events.len(),
            duration_seconds = duration_seconds,
            end_time = %end_time,
            "Session finalized"
        );

        Ok(())
    }
}

fn render_transcript(events: &[EventRecord]) -> String {
    events
        .iter()
        .map(|e| format!("{}: {}", e.event_type.as_str(), e.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_prompt(transcript: &str) -> String {
    format!(
        "You are an expert analyst. Summarize this technical conversation efficiently.\n\n\
         TRANSCRIPT:\n{}\n\nSUMMARY:",
        transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventType;

    #[test]
    fn transcript_renders_one_event_per_line() {
        let events = vec![
            EventRecord {
                event_type: EventType::UserMessage,
                content: "hello".to_string(),
                timestamp: 1,
            },
            EventRecord {
                event_type: EventType::AiResponse,
                content: "Hi there".to_string(),
                timestamp: 2,
            },
        ];

        assert_eq!(
            render_transcript(&events),
            "user_message: hello\nai_response: Hi there"
        );
    }

    #[test]
    fn summary_prompt_embeds_transcript() {
        let prompt = summary_prompt("user_message: hello");
        assert!(prompt.contains("TRANSCRIPT:\nuser_message: hello"));
        assert!(prompt.ends_with("SUMMARY:"));
    }
}
