use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: SessionInfo,
    pub sandbox: SandboxInfo,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub active: usize,
    pub streams: usize,
}

#[derive(Serialize)]
pub struct SandboxInfo {
    /// Program resources currently minted.
    pub live_handles: usize,
    pub live_bytes: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let active = state.sessions.read().await.len();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        sessions: SessionInfo {
            active,
            streams: state.stream_subscriber_count.load(Ordering::Relaxed),
        },
        sandbox: SandboxInfo {
            live_handles: state.blobs.live_count(),
            live_bytes: state.blobs.total_bytes(),
        },
    })
}

/// GET /ready. Not ready while there is nothing to play: no catalog games and
/// generation switched off.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.catalog.is_empty() && !state.config.generation.enabled {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready: empty catalog and generation disabled",
        );
    }
    (StatusCode::OK, "ready")
}
