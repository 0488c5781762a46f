// src/api/ws/message.rs
// Outbound WebSocket frame types. Inbound frames are raw prompt text and
// carry no envelope.

use serde::{Deserialize, Serialize};

/// Messages sent from the server to the client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// One streamed fragment of a generation in progress
    Token { content: String },
}
