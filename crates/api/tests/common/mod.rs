#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use ovi_api::config::ServerConfig;
use ovi_api::router::build_app_router;
use ovi_api::state::AppState;
use ovi_core::profiles::{ImageProfile, OviProfile};
use ovi_worker::config::{CollaboratorConfig, ServiceConfig};
use ovi_worker::service::JobService;
use ovi_worker::slot::ExecutionSlot;
use ovi_worker::supervisor::TokioSupervisor;

/// Collaborator body that writes one video artifact and exits 0.
pub const VIDEO_OK: &str = "echo rendering; echo clip > \"$job_dir/output/result.mp4\"";
/// Collaborator body that writes the image artifact and exits 0.
pub const IMAGE_OK: &str = "echo still > \"$job_dir/output/out.png\"";

/// A running app backed by bash collaborators inside a temp directory.
pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub async fn shutdown(&self) {
        self.state.video.shutdown().await;
        self.state.image.shutdown().await;
    }
}

/// Write a bash collaborator receiving `--config-file <path>` as `$1 $2`.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!("#!/bin/bash\ncfg=\"$2\"\njob_dir=$(dirname \"$cfg\")\n{body}\n"),
    )
    .expect("write script");
    path
}

fn service_config(dir: &Path, label: &str, jobs: &str, flag: &str, script: PathBuf) -> ServiceConfig {
    ServiceConfig {
        label: label.to_string(),
        jobs_root: dir.join(jobs),
        ready_flag: dir.join(flag),
        require_ready: false,
        collaborator: CollaboratorConfig {
            interpreter: "bash".to_string(),
            script,
            root: dir.to_path_buf(),
            extra_env: vec![],
        },
    }
}

/// Build a test `ServerConfig` rooted in `dir`.
pub fn test_config(dir: &Path, video_body: &str, image_body: &str) -> ServerConfig {
    std::fs::write(dir.join("run.json"), r#"{"sample_steps": 50}"#).expect("write run base");
    std::fs::create_dir_all(dir.join("exports")).expect("create exports");

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        ovi_root: dir.to_path_buf(),
        ckpt_dir: dir.join("ckpts"),
        run_base: dir.join("run.json"),
        exports_dir: dir.join("exports"),
        video: service_config(
            dir,
            "Ovi",
            "jobs",
            "ovi_ready",
            write_script(dir, "inference.sh", video_body),
        ),
        image: service_config(
            dir,
            "Z-Image",
            "zimage_jobs",
            "zimage_ready",
            write_script(dir, "zimage.sh", image_body),
        ),
    }
}

/// Build the full application router, mirroring `main.rs`.
pub async fn build_test_app_with(
    video_body: &str,
    image_body: &str,
    adjust: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path(), video_body, image_body);
    adjust(&mut config);

    let slot = ExecutionSlot::new();
    let video = JobService::start(
        config.video.clone(),
        Arc::new(OviProfile::new(config.run_base.clone())),
        Arc::new(TokioSupervisor),
        slot.clone(),
    )
    .await
    .expect("start video service");
    let image = JobService::start(
        config.image.clone(),
        Arc::new(ImageProfile),
        Arc::new(TokioSupervisor),
        slot,
    )
    .await
    .expect("start image service");

    let state = AppState {
        config: Arc::new(config.clone()),
        video,
        image,
    };
    let router = build_app_router(state.clone(), &config);

    TestApp { dir, state, router }
}

pub async fn build_test_app() -> TestApp {
    build_test_app_with(VIDEO_OK, IMAGE_OK, |_| {}).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll `GET {jobs_uri}/{id}` until the job is terminal; returns its `data`.
pub async fn wait_for_terminal(app: &Router, jobs_uri: &str, id: &str) -> serde_json::Value {
    for _ in 0..500 {
        let response = get(app, &format!("{jobs_uri}/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let job = body_json(response).await["data"].clone();
        if job["status"] == "succeeded" || job["status"] == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {id} did not finish in time");
}
