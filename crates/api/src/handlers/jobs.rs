//! Handlers for one job service (`/jobs`, `/images/jobs`).
//!
//! Every handler extracts the [`JobService`] it serves as router state, so
//! the same functions back both the video and the image routes.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ovi_core::job::JobStatus;
use ovi_core::profiles::JobRequest;
use ovi_worker::service::JobService;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub id: String,
    pub status: JobStatus,
}

/// Query parameters for the file endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// Path relative to the job directory. Absent or empty selects the
    /// newest artifact under `output/`.
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// GET /api/v1/ready, GET /api/v1/images/ready
pub async fn readiness(State(service): State<Arc<JobService>>) -> impl IntoResponse {
    Json(DataResponse {
        data: service.readiness(),
    })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs, POST /api/v1/images/jobs
///
/// Validate and enqueue a job. Returns 201 with the job id; the job starts
/// in `queued` and is picked up by the service's worker. Malformed bodies
/// get the usual JSON error envelope.
pub async fn submit_job(
    State(service): State<Arc<JobService>>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let id = service.submit(input).await?;

    tracing::info!(job_id = %id, profile = service.profile().name(), "Job submitted");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmittedJob {
                id,
                status: JobStatus::Queued,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}, GET /api/v1/images/jobs/{id}
pub async fn get_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = service.status(&id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/file?path=, GET /api/v1/images/jobs/{id}/file?path=
///
/// Streams a file from the job directory. Without `path`, the newest
/// artifact of the service's kind is served.
pub async fn get_job_file(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
    Query(query): Query<FileQuery>,
) -> AppResult<Response> {
    let relative = query.path.as_deref().filter(|p| !p.is_empty());
    let path = service.artifact(&id, relative).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("open {}: {e}", path.display())))?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace(['"', '\\'], "_"))
        .unwrap_or_else(|| "artifact".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&path))
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{file_name}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "wav" => "audio/wav",
        "json" => "application/json",
        "log" | "txt" | "csv" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(FsPath::new("output/a.MP4")), "video/mp4");
        assert_eq!(content_type_for(FsPath::new("output/out.png")), "image/png");
        assert_eq!(content_type_for(FsPath::new("job.log")), "text/plain; charset=utf-8");
        assert_eq!(content_type_for(FsPath::new("noext")), "application/octet-stream");
    }
}
