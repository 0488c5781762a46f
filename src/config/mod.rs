// src/config/mod.rs
// Central configuration - loaded once from the environment

pub mod llm;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::env;

lazy_static! {
    pub static ref CONFIG: StrandConfig = StrandConfig::from_env();
}

/// Main configuration structure - composes all domain configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrandConfig {
    pub gemini: llm::GeminiConfig,
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
}

impl StrandConfig {
    pub fn from_env() -> Self {
        // Don't panic if .env doesn't exist (for production)
        dotenv::dotenv().ok();

        Self {
            gemini: llm::GeminiConfig::from_env(),
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}

pub(crate) fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
