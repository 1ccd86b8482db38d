//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = match state.users.ping().await {
        Ok(()) => ("healthy", "connected", StatusCode::OK),
        Err(e) => {
            tracing::error!(error = %e, "User store health check failed");
            ("unhealthy", "disconnected", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
