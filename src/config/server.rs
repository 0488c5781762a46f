// src/config/server.rs
// Server and database configuration

use serde::{Deserialize, Serialize};

use super::env_or;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("STRAND_HOST", "0.0.0.0"),
            port: env_or("STRAND_PORT", "8000").parse().unwrap_or(8000),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("DATABASE_URL", "sqlite://strand.db?mode=rwc"),
            max_connections: env_or("STRAND_SQLITE_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
        }
    }
}
