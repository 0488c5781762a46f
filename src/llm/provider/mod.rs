// src/llm/provider/mod.rs
// LLM provider trait - clean, provider-agnostic generation interface

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

pub mod gemini;

pub use gemini::GeminiProvider;

/// Conversation role understood by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Simple message format shared by session context and providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A lazy sequence of generated text fragments. `Some(Ok)` is a fragment,
/// `Some(Err)` a backend failure terminating the stream, `None` exhaustion.
pub type FragmentStream = Box<dyn Stream<Item = Result<String>> + Send + Unpin>;

/// Universal LLM provider interface
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Stream a completion for `prompt` given the prior conversation turns.
    async fn stream(&self, prior_turns: Vec<Message>, prompt: String) -> Result<FragmentStream>;

    /// Single-shot completion. Used for post-session summarization.
    async fn generate_once(&self, prompt: String) -> Result<String>;
}
