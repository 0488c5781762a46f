// src/api/ws/mod.rs

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub mod connection;
pub mod message;

pub use connection::WebSocketConnection;
pub use message::WsServerMessage;

use crate::session::Session;
use crate::state::AppState;

/// Capacity of the outbound frame channel. A full buffer applies
/// backpressure to the relay loop when the socket falls behind.
const OUTBOUND_BUFFER: usize = 64;

pub async fn ws_session_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!(client_id = %client_id, "WebSocket upgrade request");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, client_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, client_id: String) {
    let connection_start = Instant::now();
    let (sender, mut receiver) = socket.split();
    let connection = Arc::new(WebSocketConnection::new(sender));

    // Outbound frames flow through a channel drained by a forwarder task, so
    // the relay loop never holds the socket lock across a generation await.
    let (ws_tx, mut ws_rx) = mpsc::channel::<WsServerMessage>(OUTBOUND_BUFFER);
    let forward_conn = connection.clone();
    tokio::spawn(async move {
        while let Some(msg) = ws_rx.recv().await {
            if forward_conn.send_message(msg).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::create(
        client_id.clone(),
        app_state.transcript_store.clone(),
        app_state.llm_provider.clone(),
        ws_tx,
    )
    .await;

    // Receive loop; user turns run strictly in arrival order
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Err(e) = session.on_message(text.to_string()).await {
                    warn!(session_id = %session.id(), error = %e, "Turn aborted, closing connection");
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                if let Err(e) = connection.send_pong(data).await {
                    error!(session_id = %session.id(), "Failed to send pong: {}", e);
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session.id(), "Client initiated close");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(session_id = %session.id(), "WebSocket error: {}", e);
                break;
            }
        }
    }

    connection.mark_closed().await;
    session.on_disconnect();

    info!(
        "Client {} disconnected after {:.2}s",
        client_id,
        connection_start.elapsed().as_secs_f64()
    );
}
