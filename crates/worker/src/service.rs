//! Public face of one collaborator: submit, status, artifact and readiness.
//!
//! A [`JobService`] owns a [`JobStore`], an unbounded FIFO and the worker
//! task draining it. Two services (video and image) can share one
//! [`ExecutionSlot`] so their collaborators never overlap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ovi_core::error::CoreError;
use ovi_core::job::Job;
use ovi_core::job_id::resolve_job_id;
use ovi_core::profiles::{JobProfile, JobRequest};
use ovi_core::readiness::{ReadinessProbe, ReadinessStatus};
use ovi_core::sandbox::{escapes_lexically, newest_artifact, resolve_in_sandbox};

use crate::config::ServiceConfig;
use crate::runner::ProcessRunner;
use crate::slot::ExecutionSlot;
use crate::store::{run_blocking, JobStore};
use crate::supervisor::ProcessSupervisor;
use crate::worker::Worker;

/// How long [`JobService::shutdown`] waits for the worker to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct JobService {
    store: Arc<JobStore>,
    profile: Arc<dyn JobProfile>,
    readiness: ReadinessProbe,
    require_ready: bool,
    queue: UnboundedSender<String>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobService {
    /// Open the jobs root and spawn the worker task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        config: ServiceConfig,
        profile: Arc<dyn JobProfile>,
        supervisor: Arc<dyn ProcessSupervisor>,
        slot: ExecutionSlot,
    ) -> std::io::Result<Arc<Self>> {
        let store = Arc::new(JobStore::open(&config.jobs_root).await?);
        let (queue, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = Worker {
            store: Arc::clone(&store),
            runner: ProcessRunner::new(supervisor),
            collaborator: config.collaborator,
            profile: Arc::clone(&profile),
            slot,
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(worker.run(rx));

        tracing::info!(
            profile = profile.name(),
            jobs_root = %store.root().display(),
            "Job service started"
        );

        Ok(Arc::new(Self {
            store,
            profile,
            readiness: ReadinessProbe::new(config.label, config.ready_flag),
            require_ready: config.require_ready,
            queue,
            cancel,
            worker: Mutex::new(Some(handle)),
        }))
    }

    /// Validate, materialize and enqueue a job. Returns the job id.
    ///
    /// Nothing is written to disk unless the request is accepted.
    pub async fn submit(&self, request: JobRequest) -> Result<String, CoreError> {
        request.validate()?;

        if self.require_ready && !self.readiness.is_ready() {
            return Err(CoreError::Unavailable(self.readiness.status().message));
        }
        if self.cancel.is_cancelled() {
            return Err(CoreError::Unavailable("service is shutting down".into()));
        }

        let id = resolve_job_id(request.job_id.as_deref())?;
        let job = self.store.create(&id, &self.profile, &request).await?;

        // Shutdown may have started while the job was being created.
        if self.cancel.is_cancelled() || self.queue.send(job.id.clone()).is_err() {
            tracing::warn!(job_id = %job.id, "Job queue closed, discarding job");
            self.store.discard(&job).await;
            return Err(CoreError::Unavailable("service is shutting down".into()));
        }

        tracing::info!(job_id = %job.id, profile = self.profile.name(), "Job queued");
        Ok(job.id)
    }

    /// Current record of a job, from memory or its persisted snapshot.
    pub async fn status(&self, id: &str) -> Result<Job, CoreError> {
        self.store.status(id).await
    }

    /// Locate a file produced by a job.
    ///
    /// With `path`, the file must resolve strictly inside the job directory.
    /// Without it, the most recently modified artifact under `output/` is
    /// returned, or [`CoreError::NotReady`] while the job is still queued or
    /// running and has produced nothing yet.
    ///
    /// The sandbox is always the configured jobs root joined with `id`,
    /// never a path read back from a snapshot.
    pub async fn artifact(&self, id: &str, path: Option<&str>) -> Result<PathBuf, CoreError> {
        if let Some(relative) = path {
            if escapes_lexically(relative) {
                return Err(CoreError::PathTraversal(relative.to_string()));
            }
        }

        let job = self.status(id).await?;
        let layout = self.profile.layout(self.store.job_dir(id));
        let extension = self.profile.artifact_extension();
        let relative = path.map(str::to_string);

        let located = run_blocking(move || match relative {
            Some(relative) => resolve_in_sandbox(&layout.job_dir, &relative),
            None => newest_artifact(&layout.output_dir, extension),
        })
        .await;

        match located {
            Err(CoreError::NotFound { .. }) if path.is_none() && !job.status.is_terminal() => {
                Err(CoreError::NotReady(format!(
                    "job {id} is {}, output not ready yet",
                    job.status
                )))
            }
            other => other,
        }
    }

    pub fn readiness(&self) -> ReadinessStatus {
        self.readiness.status()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn profile(&self) -> &dyn JobProfile {
        self.profile.as_ref()
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Stop the worker. A running collaborator is killed and its job is
    /// recorded as failed; jobs still queued stay `queued`.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let Some(handle) = self.worker.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                tracing::info!(profile = self.profile.name(), "Job service stopped");
            }
            Ok(Err(e)) => {
                tracing::error!(profile = self.profile.name(), error = %e, "Job worker panicked");
            }
            Err(_) => {
                tracing::warn!(
                    profile = self.profile.name(),
                    "Job worker did not stop within timeout"
                );
            }
        }
    }
}
