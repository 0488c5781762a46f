// src/state.rs
// Application state shared across handlers

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::CONFIG;
use crate::llm::provider::{GeminiProvider, LlmProvider};
use crate::store::{SqliteTranscriptStore, TranscriptStore};

/// Application state shared across handlers. The store and provider are the
/// injected collaborators every session and finalizer borrows.
#[derive(Clone)]
pub struct AppState {
    pub sqlite_pool: SqlitePool,
    pub transcript_store: Arc<dyn TranscriptStore>,
    pub llm_provider: Arc<dyn LlmProvider>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Result<Self> {
        let provider = GeminiProvider::new(
            CONFIG.gemini.api_key.clone(),
            CONFIG.gemini.model.clone(),
        )?;

        Ok(Self {
            sqlite_pool: pool.clone(),
            transcript_store: Arc::new(SqliteTranscriptStore::new(pool)),
            llm_provider: Arc::new(provider),
        })
    }
}
