use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ovi_api::config::ServerConfig;
use ovi_api::router::build_app_router;
use ovi_api::state::AppState;
use ovi_core::profiles::{ImageProfile, OviProfile};
use ovi_worker::service::JobService;
use ovi_worker::slot::ExecutionSlot;
use ovi_worker::supervisor::TokioSupervisor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ovi_api=debug,ovi_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Sanity checks ---
    if let Err(reason) = config.check_video() {
        tracing::error!(%reason, "Video collaborator is not installed");
        std::process::exit(1);
    }
    if let Err(reason) = config.image.collaborator.check() {
        tracing::warn!(%reason, "Image collaborator is not installed, image jobs will fail");
    }

    // --- Job services ---
    // One slot for the whole process: video and image jobs never overlap.
    let slot = ExecutionSlot::new();
    let supervisor = Arc::new(TokioSupervisor);

    let video = JobService::start(
        config.video.clone(),
        Arc::new(OviProfile::new(config.run_base.clone())),
        supervisor.clone(),
        slot.clone(),
    )
    .await
    .expect("Failed to start video job service");

    let image = JobService::start(
        config.image.clone(),
        Arc::new(ImageProfile),
        supervisor,
        slot,
    )
    .await
    .expect("Failed to start image job service");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        video: Arc::clone(&video),
        image: Arc::clone(&image),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // A running collaborator is killed and its job recorded as failed.
    video.shutdown().await;
    image.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
