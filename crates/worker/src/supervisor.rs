//! Process supervisor interface and its tokio-backed implementation.
//!
//! The runner only talks to [`ProcessSupervisor`] / [`SupervisedChild`], so
//! a timeout or cancellation policy can be layered on without touching the
//! queue, and tests can substitute a fake collaborator.

use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::runner::RunnerError;

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Set on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Program and arguments joined by spaces, for log headers.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Starts external processes.
pub trait ProcessSupervisor: Send + Sync {
    /// Spawn `command` with both stdout and stderr going to `output`.
    fn spawn(
        &self,
        command: &CommandSpec,
        output: File,
    ) -> Result<Box<dyn SupervisedChild>, RunnerError>;
}

/// A running child process.
#[async_trait]
pub trait SupervisedChild: Send {
    /// Wait for exit and return the exit code (`-1` if killed by a signal).
    async fn wait(&mut self) -> Result<i32, RunnerError>;

    /// Kill the process and reap it.
    async fn kill(&mut self) -> Result<(), RunnerError>;
}

/// Spawns real processes via [`tokio::process`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSupervisor;

impl ProcessSupervisor for TokioSupervisor {
    fn spawn(
        &self,
        command: &CommandSpec,
        output: File,
    ) -> Result<Box<dyn SupervisedChild>, RunnerError> {
        let stderr = output.try_clone().map_err(RunnerError::Redirect)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            // A dropped handle (e.g. the worker task aborted) must not leave
            // an orphaned GPU process behind.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        tracing::debug!(pid = ?child.id(), program = %command.program, "Spawned collaborator");
        Ok(Box::new(TokioChild(child)))
    }
}

struct TokioChild(Child);

#[async_trait]
impl SupervisedChild for TokioChild {
    async fn wait(&mut self) -> Result<i32, RunnerError> {
        let status = self.0.wait().await.map_err(RunnerError::Wait)?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn kill(&mut self) -> Result<(), RunnerError> {
        self.0.kill().await.map_err(RunnerError::Kill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec {
            program: "python3".into(),
            args: vec!["inference.py".into(), "--config-file".into(), "run.json".into()],
            cwd: PathBuf::from("/opt/ovi"),
            env: vec![],
        };
        assert_eq!(spec.display(), "python3 inference.py --config-file run.json");
    }
}
