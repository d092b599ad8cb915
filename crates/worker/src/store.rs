//! Job registry plus per-job status snapshots on disk.
//!
//! The in-memory map is authoritative while the process lives. Every
//! transition is also written to `<job_dir>/job_status.json` (temp file +
//! rename, so readers never see a half-written record); after a restart,
//! status reads fall back to that snapshot.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use ovi_core::error::CoreError;
use ovi_core::job::{self, Job};
use ovi_core::job_id::is_valid_job_id;
use ovi_core::profiles::{JobProfile, JobRequest};

/// Failure to write or read a status snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("status file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("status file (de)serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Owns the jobs root directory and the in-memory job registry.
pub struct JobStore {
    root: PathBuf,
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    /// Create the jobs root if needed and resolve it to an absolute path.
    pub async fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(&root).await?;
        Ok(Self {
            root,
            jobs: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Create the job directory and its artifacts, register the job as
    /// `queued`, and persist the first snapshot.
    ///
    /// `id` must already be sanitized. The directory is created with a
    /// non-recursive `create_dir`, so of two racing submissions with the same
    /// id exactly one wins and the other gets [`CoreError::Conflict`].
    pub async fn create(
        &self,
        id: &str,
        profile: &Arc<dyn JobProfile>,
        request: &JobRequest,
    ) -> Result<Job, CoreError> {
        let job_dir = self.job_dir(id);
        let conflict = || CoreError::Conflict(format!("job_id '{id}' already exists"));

        if tokio::fs::try_exists(&job_dir).await.unwrap_or(false) {
            return Err(conflict());
        }

        let layout = profile.layout(job_dir.clone());
        let artifacts = {
            let profile = Arc::clone(profile);
            let request = request.clone();
            let layout = layout.clone();
            run_blocking(move || profile.build(&request, &layout)).await?
        };

        match tokio::fs::create_dir(&job_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(conflict()),
            Err(e) => return Err(io_internal("create job directory", &job_dir, e)),
        }

        tokio::fs::create_dir(&layout.output_dir)
            .await
            .map_err(|e| io_internal("create output directory", &layout.output_dir, e))?;
        tokio::fs::write(&layout.input_path, &artifacts.input)
            .await
            .map_err(|e| io_internal("write input artifact", &layout.input_path, e))?;
        tokio::fs::write(&layout.config_path, &artifacts.config)
            .await
            .map_err(|e| io_internal("write config artifact", &layout.config_path, e))?;

        let job = Job::new(id.to_string(), layout, Utc::now());
        self.update(&job).await;
        Ok(job)
    }

    /// Forget a job that was created but never enqueued, and remove its
    /// directory.
    pub async fn discard(&self, job: &Job) {
        self.jobs.write().await.remove(&job.id);
        if let Err(e) = tokio::fs::remove_dir_all(&job.layout.job_dir).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to remove discarded job");
        }
    }

    /// The in-memory record, if this process knows the job.
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// In-memory record first, then the persisted snapshot.
    pub async fn status(&self, id: &str) -> Result<Job, CoreError> {
        if let Some(job) = self.get(id).await {
            return Ok(job);
        }
        if !is_valid_job_id(id) {
            return Err(CoreError::job_not_found(id));
        }
        match self.load_snapshot(id).await {
            Ok(Some(job)) => Ok(job),
            Ok(None) => Err(CoreError::job_not_found(id)),
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Unreadable status snapshot");
                Err(CoreError::Internal(format!(
                    "status snapshot for job {id} is unreadable"
                )))
            }
        }
    }

    /// Replace the registry entry and persist it.
    ///
    /// Persistence is best-effort: a failure is logged and otherwise
    /// ignored, the in-memory record stays authoritative.
    pub async fn update(&self, job: &Job) {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        if let Err(e) = self.persist(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to persist job status");
        }
    }

    /// Write the full record to its status file atomically.
    pub async fn persist(&self, job: &Job) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(job)?;
        let target = job.layout.status_path();
        let tmp = job.layout.job_dir.join(format!(".{}.tmp", job::STATUS_FILE_NAME));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    /// Read the persisted snapshot for `id`. `Ok(None)` if there is none.
    pub async fn load_snapshot(&self, id: &str) -> Result<Option<Job>, PersistError> {
        let path = job::status_path(&self.job_dir(id));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Run blocking filesystem work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, CoreError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CoreError::Internal(format!("blocking task failed: {e}")))?
}

fn io_internal(action: &str, path: &Path, err: std::io::Error) -> CoreError {
    tracing::error!(path = %path.display(), error = %err, "Failed to {action}");
    CoreError::Internal(format!("failed to {action}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
