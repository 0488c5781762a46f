// src/api/http/health.rs
//
// Health check and readiness endpoints for load balancers and Kubernetes probes.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    db: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    migrations: &'static str,
}

/// Health check endpoint for load balancers.
/// Returns 200 if the database is reachable, 503 otherwise.
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1")
        .fetch_one(&state.sqlite_pool)
        .await
        .is_ok();

    let response = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" },
        db: if db_ok { "ok" } else { "error" },
    };

    if db_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Readiness probe for Kubernetes startup.
/// Returns 200 once the schema is in place.
///
/// GET /ready
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let migrations_ok = sqlx::query("SELECT 1 FROM session_metadata LIMIT 1")
        .fetch_optional(&state.sqlite_pool)
        .await
        .is_ok();

    let response = ReadyResponse {
        status: if migrations_ok { "ready" } else { "not_ready" },
        migrations: if migrations_ok { "applied" } else { "pending" },
    };

    if migrations_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Liveness probe - simple ping to verify the server is running.
///
/// GET /live
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "alive"})))
}
