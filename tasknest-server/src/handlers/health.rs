use axum::Json;
use chrono::Utc;

use crate::dto::HealthResponse;

/// Readiness probe: answers as soon as the HTTP server is up, with no
/// database check, so callers can gate their first real request on it.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
