// src/session/relay.rs
// Per-turn relay loop: drive one generation and forward fragments as they arrive

use anyhow::{Result, anyhow};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ws::message::WsServerMessage;
use crate::llm::provider::{LlmProvider, Message};
use crate::store::{EventType, TranscriptStore};

/// Run one generation cycle for the just-appended user message.
///
/// Every non-empty fragment is forwarded the moment it arrives, and the
/// concatenation is logged as a single `ai_response` event at stream end, so
/// the logged content always equals what the client was sent for the turn.
/// Generation faults stay inside the turn: they surface to the client as an
/// inline `[Error: ...]` fragment and the connection stays open. Only a dead
/// outbound channel is a hard error.
pub async fn run_turn(
    llm: &dyn LlmProvider,
    store: &dyn TranscriptStore,
    session_id: &str,
    context: &mut Vec<Message>,
    ws_tx: &mpsc::Sender<WsServerMessage>,
) -> Result<()> {
    let prompt = context.last().map(|m| m.content.clone()).unwrap_or_default();
    let prior_turns = context[..context.len().saturating_sub(1)].to_vec();

    let mut full_response = String::new();

    match llm.stream(prior_turns, prompt).await {
        Ok(mut fragments) => {
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(chunk) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        full_response.push_str(&chunk);
                        forward(ws_tx, chunk).await?;
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Generation stream failed mid-turn");
                        let marker = format!("[Error: {}]", e);
                        full_response.push_str(&marker);
                        forward(ws_tx, marker).await?;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Generation request failed");
            let marker = format!("[Error: {}]", e);
            full_response.push_str(&marker);
            forward(ws_tx, marker).await?;
        }
    }

    if let Err(e) = store
        .append_event(session_id, EventType::AiResponse, &full_response)
        .await
    {
        warn!(session_id = %session_id, error = %e, "Failed to log assistant response");
    }

    debug!(
        session_id = %session_id,
        response_len = full_response.len(),
        "Turn complete"
    );

    context.push(Message::assistant(full_response));
    Ok(())
}

async fn forward(ws_tx: &mpsc::Sender<WsServerMessage>, content: String) -> Result<()> {
    ws_tx
        .send(WsServerMessage::Token { content })
        .await
        .map_err(|_| anyhow!("Client channel closed"))
}
