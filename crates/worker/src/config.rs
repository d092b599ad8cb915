//! Plain configuration structs for a job service.
//!
//! Loading from the environment happens in the binary; this crate only
//! consumes already-resolved values.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::supervisor::CommandSpec;

/// Environment variable holding the interpreter's module search path.
pub const MODULE_PATH_VAR: &str = "PYTHONPATH";

/// How to launch the external collaborator.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    /// Interpreter binary (e.g. `python3` or a venv's `bin/python`).
    pub interpreter: String,
    /// Entry script passed as the first argument.
    pub script: PathBuf,
    /// Installation root: working directory and module search path entry.
    pub root: PathBuf,
    /// Extra environment variables set for every run.
    pub extra_env: Vec<(String, String)>,
}

impl CollaboratorConfig {
    /// `<interpreter> <script> --config-file <config_path>` run from the
    /// collaborator root with the root prepended to the module search path.
    pub fn command(&self, config_path: &Path) -> CommandSpec {
        let mut env = self.extra_env.clone();
        env.push((
            MODULE_PATH_VAR.to_string(),
            prepend_search_path(&self.root, std::env::var_os(MODULE_PATH_VAR)),
        ));

        CommandSpec {
            program: self.interpreter.clone(),
            args: vec![
                self.script.to_string_lossy().into_owned(),
                "--config-file".to_string(),
                config_path.to_string_lossy().into_owned(),
            ],
            cwd: self.root.clone(),
            env,
        }
    }

    /// File name of the entry script, used in failure messages.
    pub fn script_name(&self) -> String {
        self.script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.script.to_string_lossy().into_owned())
    }

    /// Startup sanity check: the root and the entry script must exist.
    pub fn check(&self) -> Result<(), String> {
        if !self.root.is_dir() {
            return Err(format!("collaborator root missing: {}", self.root.display()));
        }
        if !self.script.is_file() {
            return Err(format!("collaborator script missing: {}", self.script.display()));
        }
        Ok(())
    }
}

fn prepend_search_path(root: &Path, existing: Option<OsString>) -> String {
    let root = root.to_string_lossy();
    match existing {
        Some(value) if !value.is_empty() => format!("{root}:{}", value.to_string_lossy()),
        _ => root.into_owned(),
    }
}

/// Everything one [`JobService`](crate::service::JobService) needs besides
/// its profile and supervisor.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Human-readable collaborator name used in readiness messages.
    pub label: String,
    /// Flat directory holding one subdirectory per job.
    pub jobs_root: PathBuf,
    /// Sentinel file created once model assets are provisioned.
    pub ready_flag: PathBuf,
    /// Reject submissions while the sentinel file is missing.
    pub require_ready: bool,
    pub collaborator: CollaboratorConfig,
}
