// tests/common/mod.rs
// Shared test fixtures: in-memory database and a scripted generation backend

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::mpsc;

use strand_backend::api::ws::message::WsServerMessage;
use strand_backend::llm::provider::{FragmentStream, LlmProvider, Message};

/// Fresh in-memory database with the schema applied. A single pooled
/// connection keeps every task on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

/// One scripted fragment outcome for a streamed turn.
#[derive(Clone)]
pub enum Fragment {
    Text(&'static str),
    Fail(&'static str),
}

/// What the scripted backend answers to a single-shot summary request.
#[derive(Clone)]
pub enum SummaryScript {
    Reply(&'static str),
    Fail(&'static str),
}

/// Generation backend that replays scripted fragments, one script per turn.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Vec<Fragment>>>,
    summary: SummaryScript,
    last_summary_prompt: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Vec<Fragment>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            summary: SummaryScript::Reply("A short chat."),
            last_summary_prompt: Mutex::new(None),
        }
    }

    pub fn with_summary(mut self, summary: SummaryScript) -> Self {
        self.summary = summary;
        self
    }

    /// The prompt passed to the most recent `generate_once` call.
    pub fn last_summary_prompt(&self) -> Option<String> {
        self.last_summary_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn stream(&self, _prior_turns: Vec<Message>, _prompt: String) -> Result<FragmentStream> {
        let script = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let items: Vec<Result<String>> = script
            .into_iter()
            .map(|f| match f {
                Fragment::Text(t) => Ok(t.to_string()),
                Fragment::Fail(msg) => Err(anyhow!(msg)),
            })
            .collect();

        Ok(Box::new(futures::stream::iter(items)))
    }

    async fn generate_once(&self, prompt: String) -> Result<String> {
        *self.last_summary_prompt.lock().unwrap() = Some(prompt);

        match &self.summary {
            SummaryScript::Reply(text) => Ok(text.to_string()),
            SummaryScript::Fail(msg) => Err(anyhow!(*msg)),
        }
    }
}

/// Drain every frame currently queued on the outbound channel.
pub fn drain_frames(rx: &mut mpsc::Receiver<WsServerMessage>) -> Vec<String> {
    let mut frames = Vec::new();
    while let Ok(WsServerMessage::Token { content }) = rx.try_recv() {
        frames.push(content);
    }
    frames
}
