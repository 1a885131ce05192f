//! Health check handler

use axum::{Json, response::IntoResponse};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Liveness check; always succeeds while the server is accepting requests.
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "image-optimizer",
    })
}
