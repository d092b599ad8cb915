//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub ovi_root: String,
    pub ckpt_dir: String,
    /// Readiness flags of both collaborators.
    pub video_ready: bool,
    pub image_ready: bool,
}

/// GET /health -- returns service liveness and provisioning state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ovi_root: state.config.ovi_root.display().to_string(),
        ckpt_dir: state.config.ckpt_dir.display().to_string(),
        video_ready: state.video.is_ready(),
        image_ready: state.image.is_ready(),
    })
}
