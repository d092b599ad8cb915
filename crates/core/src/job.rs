//! Job record, lifecycle state machine, and per-job directory layout.
//!
//! A job moves strictly `queued -> running -> {succeeded | failed}`. The
//! transition methods on [`Job`] are the only way to change its status and
//! they reject every other move, so a terminal job can never revert.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// `true` for `succeeded` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Name of the output subdirectory inside every job directory.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Name of the execution log file inside every job directory.
pub const LOG_FILE_NAME: &str = "job.log";

/// Name of the persisted status snapshot inside every job directory.
pub const STATUS_FILE_NAME: &str = "job_status.json";

/// Absolute paths owned by one job. Fixed at creation, never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLayout {
    pub job_dir: PathBuf,
    pub config_path: PathBuf,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
}

impl JobLayout {
    /// Build the layout for a job directory. `job_dir` should already be
    /// absolute; every other path is derived from it.
    pub fn new(job_dir: PathBuf, config_file: &str, input_file: &str) -> Self {
        Self {
            config_path: job_dir.join(config_file),
            input_path: job_dir.join(input_file),
            output_dir: job_dir.join(OUTPUT_DIR_NAME),
            log_path: job_dir.join(LOG_FILE_NAME),
            job_dir,
        }
    }

    /// Location of the persisted status snapshot.
    pub fn status_path(&self) -> PathBuf {
        status_path(&self.job_dir)
    }
}

/// Location of the status snapshot for an arbitrary job directory.
pub fn status_path(job_dir: &Path) -> PathBuf {
    job_dir.join(STATUS_FILE_NAME)
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One submitted unit of work wrapping a single external process invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    #[serde(flatten)]
    pub layout: JobLayout,
}

impl Job {
    /// A freshly submitted job in `queued` state.
    pub fn new(id: String, layout: JobLayout, now: Timestamp) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            created_at: now,
            started_at: None,
            finished_at: None,
            exit_code: None,
            error: None,
            layout,
        }
    }

    /// `queued -> running`; stamps `started_at`.
    pub fn mark_running(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Queued, JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.started_at = Some(now.max(self.created_at));
        Ok(())
    }

    /// `running -> succeeded`; stamps `finished_at` and clears any error.
    pub fn succeed(&mut self, now: Timestamp, exit_code: i32) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Running, JobStatus::Succeeded)?;
        self.status = JobStatus::Succeeded;
        self.exit_code = Some(exit_code);
        self.error = None;
        self.finished_at = Some(self.clamp_finish(now));
        Ok(())
    }

    /// `running -> failed`; stamps `finished_at`.
    ///
    /// `exit_code` is `None` when the process never produced one (spawn
    /// failure, interrupted wait).
    pub fn fail(
        &mut self,
        now: Timestamp,
        exit_code: Option<i32>,
        error: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Running, JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.exit_code = exit_code;
        self.error = Some(error.into());
        self.finished_at = Some(self.clamp_finish(now));
        Ok(())
    }

    fn expect_status(&self, from: JobStatus, to: JobStatus) -> Result<(), CoreError> {
        if self.status == from {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Job {} cannot move from {} to {to}",
                self.id, self.status
            )))
        }
    }

    fn clamp_finish(&self, now: Timestamp) -> Timestamp {
        now.max(self.started_at.unwrap_or(self.created_at))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
