//! Health check handler (§6.1).

use axum::{response::IntoResponse, Json};

use crate::types::HealthResponse;

/// `GET /api/health` - liveness probe.
pub async fn health_check() -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Json(HealthResponse {
        status: "ok",
        timestamp,
    })
}
