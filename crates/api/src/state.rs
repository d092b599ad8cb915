use std::sync::Arc;

use ovi_worker::service::JobService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Video jobs (Ovi inference).
    pub video: Arc<JobService>,
    /// Image jobs. Shares the execution slot with `video`.
    pub image: Arc<JobService>,
}
