// src/main.rs

use axum::{Router, routing::get};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use strand_backend::api::http::{health_check, liveness_check, readiness_check};
use strand_backend::api::ws::ws_session_handler;
use strand_backend::config::CONFIG;
use strand_backend::state::AppState;
use tower_http::cors::{Any, CorsLayer};

/// Graceful shutdown signal handler for SIGTERM and Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Strand Backend");
    info!("Model: {}", CONFIG.gemini.model);

    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect(&CONFIG.database.url)
        .await?;

    // Set critical PRAGMAs for production
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    info!("Database PRAGMAs configured for production");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database schema up to date");

    let app_state = Arc::new(AppState::new(pool.clone())?);

    // Build router with WebSocket and health endpoints
    let app = Router::new()
        .route("/ws/session/{client_id}", get(ws_session_handler))
        // Health endpoints for load balancers and Kubernetes
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state);

    let bind_address = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(
        "WebSocket server listening on ws://{}/ws/session/{{client_id}}",
        bind_address
    );
    info!("Health endpoints: /health, /ready, /live");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down gracefully...");
    Ok(())
}
