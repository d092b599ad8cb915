//! The single consumer of a service's job queue.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use ovi_core::job::Job;
use ovi_core::profiles::JobProfile;
use ovi_core::sandbox::newest_artifact;

use crate::config::CollaboratorConfig;
use crate::runner::{ProcessRunner, RunnerError};
use crate::slot::ExecutionSlot;
use crate::store::{run_blocking, JobStore};

/// Pops job ids in FIFO order and runs them one at a time.
pub(crate) struct Worker {
    pub(crate) store: Arc<JobStore>,
    pub(crate) runner: ProcessRunner,
    pub(crate) collaborator: CollaboratorConfig,
    pub(crate) profile: Arc<dyn JobProfile>,
    pub(crate) slot: ExecutionSlot,
    pub(crate) cancel: CancellationToken,
}

impl Worker {
    /// Main loop. Exits when `cancel` fires or every sender is gone.
    pub(crate) async fn run(self, mut queue: UnboundedReceiver<String>) {
        tracing::info!(profile = self.profile.name(), "Job worker started");

        loop {
            let id = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = queue.recv() => match next {
                    Some(id) => id,
                    None => break,
                },
            };
            self.execute(&id).await;
        }

        tracing::info!(profile = self.profile.name(), "Job worker stopped");
    }

    async fn execute(&self, id: &str) {
        let Some(mut job) = self.store.get(id).await else {
            tracing::warn!(job_id = %id, "Dequeued unknown job, skipping");
            return;
        };

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            permit = self.slot.acquire() => match permit {
                Some(permit) => permit,
                None => {
                    tracing::error!(job_id = %id, "Execution slot closed");
                    return;
                }
            },
        };

        if let Err(e) = job.mark_running(Utc::now()) {
            tracing::error!(job_id = %id, error = %e, "Cannot start job");
            return;
        }
        self.store.update(&job).await;

        let command = self.collaborator.command(&job.layout.config_path);
        tracing::info!(
            job_id = %id,
            profile = self.profile.name(),
            command = %command.display(),
            "Job started"
        );

        let outcome = self
            .runner
            .run(&command, &job.layout.log_path, &self.cancel)
            .await;
        self.finish(&mut job, outcome).await;
        self.store.update(&job).await;
    }

    /// Apply the terminal transition for a finished run.
    async fn finish(&self, job: &mut Job, outcome: Result<i32, RunnerError>) {
        let now = Utc::now();
        let script = self.collaborator.script_name();
        let extension = self.profile.artifact_extension();

        let result = match outcome {
            Ok(0) => {
                let output_dir = job.layout.output_dir.clone();
                match run_blocking(move || newest_artifact(&output_dir, extension)).await {
                    Ok(_) => job.succeed(now, 0),
                    Err(_) => job.fail(
                        now,
                        Some(0),
                        format!("{script} exited with code 0 but produced no .{extension} output"),
                    ),
                }
            }
            Ok(code) => job.fail(now, Some(code), format!("{script} exited with code {code}")),
            Err(e) => job.fail(now, None, e.to_string()),
        };
        if let Err(e) = result {
            tracing::error!(job_id = %job.id, error = %e, "Invalid terminal transition");
            return;
        }

        match job.error.as_deref() {
            None => tracing::info!(job_id = %job.id, exit_code = ?job.exit_code, "Job succeeded"),
            Some(error) => tracing::warn!(
                job_id = %job.id,
                exit_code = ?job.exit_code,
                error,
                "Job failed"
            ),
        }
    }
}
