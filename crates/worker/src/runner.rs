//! Runs one external command with its combined output captured in a log.
//!
//! The log file starts with two header lines naming the exact command and
//! working directory; the child's stdout and stderr are appended after them.
//! There is no timeout: an unresponsive child holds the queue until it
//! exits or the service shuts down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::supervisor::{CommandSpec, ProcessSupervisor};

/// Prefix of the header lines written before the child's output.
pub const LOG_HEADER_PREFIX: &str = "[ovi]";

/// Errors from spawning or supervising the collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to prepare log file {path}: {source}")]
    Log {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to redirect child output: {0}")]
    Redirect(std::io::Error),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed waiting for child process: {0}")]
    Wait(std::io::Error),

    #[error("failed to kill child process: {0}")]
    Kill(std::io::Error),

    #[error("interrupted by shutdown")]
    Interrupted,
}

/// Spawns one child at a time through a [`ProcessSupervisor`].
#[derive(Clone)]
pub struct ProcessRunner {
    supervisor: Arc<dyn ProcessSupervisor>,
}

impl ProcessRunner {
    pub fn new(supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Run `command` to completion and return its exit code.
    ///
    /// The wait is asynchronous, so other tasks keep running. If `cancel`
    /// fires first the child is killed and [`RunnerError::Interrupted`] is
    /// returned.
    pub async fn run(
        &self,
        command: &CommandSpec,
        log_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<i32, RunnerError> {
        let output = open_log(command, log_path).await?;
        let mut child = self.supervisor.spawn(command, output)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(program = %command.program, "Killing collaborator on shutdown");
                child.kill().await?;
                Err(RunnerError::Interrupted)
            }
            code = child.wait() => code,
        }
    }
}

/// Create (truncate) the log, write the headers, and reopen it in append
/// mode for the child.
async fn open_log(command: &CommandSpec, log_path: &Path) -> Result<std::fs::File, RunnerError> {
    let log_err = |source| RunnerError::Log {
        path: log_path.to_path_buf(),
        source,
    };

    if let Some(parent) = log_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(log_err)?;
    }

    let header = format!(
        "{LOG_HEADER_PREFIX} cmd={}\n{LOG_HEADER_PREFIX} cwd={}\n",
        command.display(),
        command.cwd.display()
    );
    let mut file = tokio::fs::File::create(log_path).await.map_err(log_err)?;
    file.write_all(header.as_bytes()).await.map_err(log_err)?;
    file.flush().await.map_err(log_err)?;
    drop(file);

    let file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(log_path)
        .await
        .map_err(log_err)?;
    Ok(file.into_std().await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::supervisor::TokioSupervisor;

    fn bash(script: &str, cwd: &Path) -> CommandSpec {
        CommandSpec {
            program: "bash".into(),
            args: vec!["-c".into(), script.into()],
            cwd: cwd.to_path_buf(),
            env: vec![("MY_VAR".into(), "hello_world".into())],
        }
    }

    fn runner() -> ProcessRunner {
        ProcessRunner::new(Arc::new(TokioSupervisor))
    }

    #[tokio::test]
    async fn log_has_headers_then_combined_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("job.log");
        let cmd = bash("echo out-line; echo err-line 1>&2; echo $MY_VAR", dir.path());

        let code = runner()
            .run(&cmd, &log, &CancellationToken::new())
            .await
            .expect("run");
        assert_eq!(code, 0);

        let contents = std::fs::read_to_string(&log).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], format!("[ovi] cmd={}", cmd.display()));
        assert_eq!(lines[1], format!("[ovi] cwd={}", dir.path().display()));
        assert!(contents.contains("out-line"));
        assert!(contents.contains("err-line"));
        assert!(contents.contains("hello_world"));
    }

    #[tokio::test]
    async fn nonzero_exit_code_is_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let code = runner()
            .run(&bash("exit 7", dir.path()), &dir.path().join("job.log"), &CancellationToken::new())
            .await
            .expect("run");
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn runs_in_configured_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("logs/job.log");
        runner()
            .run(&bash("pwd > where.txt", dir.path()), &log, &CancellationToken::new())
            .await
            .expect("run");
        let pwd = std::fs::read_to_string(dir.path().join("where.txt")).expect("pwd output");
        let expected = dir.path().canonicalize().expect("canonicalize");
        assert_eq!(Path::new(pwd.trim()).canonicalize().expect("canonicalize"), expected);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cmd = CommandSpec {
            program: "/definitely/not/a/binary".into(),
            args: vec![],
            cwd: dir.path().to_path_buf(),
            env: vec![],
        };
        let result = runner()
            .run(&cmd, &dir.path().join("job.log"), &CancellationToken::new())
            .await;
        assert_matches!(result, Err(RunnerError::Spawn { .. }));
        // Headers are written even when the spawn fails.
        let contents = std::fs::read_to_string(dir.path().join("job.log")).expect("read log");
        assert!(contents.starts_with("[ovi] cmd=/definitely/not/a/binary"));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = runner()
            .run(&bash("sleep 30", dir.path()), &dir.path().join("job.log"), &cancel)
            .await;
        assert_matches!(result, Err(RunnerError::Interrupted));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
