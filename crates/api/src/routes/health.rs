//! Health check endpoints.
//!
//! These bodies are plain JSON, outside the response envelope, so load
//! balancers and probes can read them directly.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::AppState;

/// Liveness and environment summary.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy`.
    pub status: &'static str,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Deployment environment.
    pub environment: String,
    /// Service version.
    pub version: &'static str,
}

/// Readiness of the service and its dependencies.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// `ready` or `not_ready`.
    pub status: &'static str,
    /// Result of each check.
    pub checks: BTreeMap<&'static str, bool>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        environment: state.config.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = match tidepool_db::ping(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "readiness: database ping failed");
            false
        }
    };
    let checks = BTreeMap::from([("server", true), ("database", database)]);

    let (status, label) = if checks.values().all(|ok| *ok) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    (
        status,
        Json(ReadyResponse {
            status: label,
            checks,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
}
