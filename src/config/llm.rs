// src/config/llm.rs
// Gemini configuration

use serde::{Deserialize, Serialize};

use super::env_or;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_or("GEMINI_API_KEY", ""),
            model: env_or("STRAND_GEMINI_MODEL", "gemini-2.5-flash"),
        }
    }
}
