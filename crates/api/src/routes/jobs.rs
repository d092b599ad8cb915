//! Route definitions for one job service.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use ovi_worker::service::JobService;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes for `service`, mounted at `/api/v1` (video) or `/api/v1/images`.
///
/// ```text
/// GET    /ready              -> readiness
/// POST   /jobs               -> submit_job
/// GET    /jobs/{id}          -> get_job
/// GET    /jobs/{id}/file     -> get_job_file
/// ```
pub fn router(service: Arc<JobService>) -> Router<AppState> {
    Router::new()
        .route("/ready", get(jobs::readiness))
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/file", get(jobs::get_job_file))
        .with_state(service)
}
