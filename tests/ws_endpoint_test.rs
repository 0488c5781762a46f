// tests/ws_endpoint_test.rs
// End-to-end WebSocket flow: upgrade, streamed token frames, disconnect,
// background finalization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use common::{Fragment, ScriptedProvider, test_pool};
use strand_backend::api::ws::ws_session_handler;
use strand_backend::state::AppState;
use strand_backend::store::SqliteTranscriptStore;

async fn spawn_server(llm: Arc<ScriptedProvider>) -> (String, SqlitePool) {
    let pool = test_pool().await;

    let app_state = Arc::new(AppState {
        sqlite_pool: pool.clone(),
        transcript_store: Arc::new(SqliteTranscriptStore::new(pool.clone())),
        llm_provider: llm,
    });

    let app = Router::new()
        .route("/ws/session/{client_id}", get(ws_session_handler))
        .with_state(app_state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://127.0.0.1:{}", addr.port()), pool)
}

async fn next_token_frame(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> String {
    loop {
        match ws.next().await.expect("socket closed early").unwrap() {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(frame["type"], "token");
                return frame["content"].as_str().unwrap().to_string();
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn full_session_roundtrip_streams_then_finalizes() {
    let llm = Arc::new(ScriptedProvider::new(vec![vec![
        Fragment::Text("Hi"),
        Fragment::Text(" there"),
    ]]));
    let (base_url, pool) = spawn_server(llm).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/session/client-42", base_url))
        .await
        .expect("Failed to connect");

    ws.send(Message::text("hello")).await.unwrap();

    assert_eq!(next_token_frame(&mut ws).await, "Hi");
    assert_eq!(next_token_frame(&mut ws).await, " there");

    ws.close(None).await.unwrap();
    drop(ws);

    // finalization runs detached; poll the metadata record until it closes
    let mut closed: Option<(Option<i64>, Option<String>, Option<i64>)> = None;
    for _ in 0..50 {
        let row: Option<(Option<i64>, Option<String>, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT end_time, session_summary, duration_seconds
            FROM session_metadata
            WHERE user_id = ? AND end_time IS NOT NULL
            "#,
        )
        .bind("client-42")
        .fetch_optional(&pool)
        .await
        .unwrap();

        if row.is_some() {
            closed = row;
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }

    let (end_time, summary, duration) = closed.expect("session never finalized");
    assert!(end_time.is_some());
    assert!(summary.is_some());
    assert!(duration.unwrap() >= 0);

    // both turn events were durably logged before finalization
    let events: Vec<(String, String)> = sqlx::query_as(
        "SELECT event_type, content FROM event_log ORDER BY timestamp ASC, id ASC",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ("user_message".to_string(), "hello".to_string()));
    assert_eq!(events[1], ("ai_response".to_string(), "Hi there".to_string()));
}
