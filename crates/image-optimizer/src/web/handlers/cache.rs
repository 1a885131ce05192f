//! Cache maintenance handlers

use axum::{extract::State, response::Response};
use serde::Serialize;
use tracing::info;

use crate::web::{
    AppState,
    responses::{handle_error, ok, ok_enveloped},
};

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// `GET /api/cache/stats`
pub async fn cache_stats(State(state): State<AppState>) -> Response {
    ok(state.optimizer.stats().await)
}

/// `POST /api/cache/cleanup` runs an expiry sweep immediately.
pub async fn cleanup_cache(State(state): State<AppState>) -> Response {
    match state.optimizer.cleanup_now().await {
        Ok(removed) => {
            info!(removed, "Manual cache cleanup completed");
            ok_enveloped(CleanupResponse { removed })
        }
        Err(e) => handle_error(e),
    }
}
