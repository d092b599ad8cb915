pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ready                                  video readiness
/// /jobs                                   submit video job (POST)
/// /jobs/{id}                              video job status
/// /jobs/{id}/file?path=                   video artifact or job file
///
/// /images/ready                           image readiness
/// /images/jobs                            submit image job (POST)
/// /images/jobs/{id}                       image job status
/// /images/jobs/{id}/file?path=            image artifact or job file
/// ```
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(jobs::router(state.video.clone()))
        .nest("/images", jobs::router(state.image.clone()))
}
