use std::path::PathBuf;

use ovi_worker::config::{CollaboratorConfig, ServiceConfig};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults matching the container layout under
/// `/workspace`. Override via environment variables (or a `.env` file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Ovi installation root.
    pub ovi_root: PathBuf,
    /// Model checkpoint directory, reported by `/health`.
    pub ckpt_dir: PathBuf,
    /// Base run config every video job's `run.json` is derived from.
    pub run_base: PathBuf,
    /// Directory served read-only under `/exports`.
    pub exports_dir: PathBuf,
    pub video: ServiceConfig,
    pub image: ServiceConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                        |
    /// |------------------------|--------------------------------|
    /// | `HOST`                 | `0.0.0.0`                      |
    /// | `PORT`                 | `3000`                         |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                           |
    /// | `OVI_ROOT`             | `/workspace/Ovi`               |
    /// | `OVI_CKPT_DIR`         | `$OVI_ROOT/ckpts`              |
    /// | `OVI_RUN_BASE`         | `$OVI_ROOT/run.json`           |
    /// | `OVI_JOBS_DIR`         | `/workspace/jobs`              |
    /// | `OVI_PYTHON`           | `python3`                      |
    /// | `OVI_SCRIPT`           | `$OVI_ROOT/inference.py`       |
    /// | `OVI_READY_FLAG`       | `/workspace/status/ovi_ready`  |
    /// | `OVI_REQUIRE_READY`    | `false`                        |
    /// | `ZIMAGE_PY`            | `python3`                      |
    /// | `ZIMAGE_SCRIPT`        | `$OVI_ROOT/tools/zimage.py`    |
    /// | `ZIMAGE_JOBS_ROOT`     | `/workspace/jobs/zimage`       |
    /// | `STATUS_DIR`           | `/workspace/status`            |
    /// | `ZIMAGE_READY_FLAG`    | `$STATUS_DIR/zimage_ready`     |
    /// | `ZIMAGE_REQUIRE_READY` | `true`                         |
    /// | `HF_HOME`              | `/workspace/.cache/hf`         |
    /// | `EXPORTS_DIR`          | `/workspace/exports`           |
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    ///
    /// Panics on unparsable numeric or boolean values, like `from_env`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let path_or = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let host = var("HOST", "0.0.0.0");

        let port: u16 = var("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        // --- Video (Ovi) ---
        let ovi_root = PathBuf::from(var("OVI_ROOT", "/workspace/Ovi"));
        let ckpt_dir = path_or("OVI_CKPT_DIR", ovi_root.join("ckpts"));
        let run_base = path_or("OVI_RUN_BASE", ovi_root.join("run.json"));

        let video = ServiceConfig {
            label: "Ovi".to_string(),
            jobs_root: PathBuf::from(var("OVI_JOBS_DIR", "/workspace/jobs")),
            ready_flag: PathBuf::from(var("OVI_READY_FLAG", "/workspace/status/ovi_ready")),
            require_ready: parse_bool("OVI_REQUIRE_READY", &var("OVI_REQUIRE_READY", "false")),
            collaborator: CollaboratorConfig {
                interpreter: var("OVI_PYTHON", "python3"),
                script: path_or("OVI_SCRIPT", ovi_root.join("inference.py")),
                root: ovi_root.clone(),
                extra_env: Vec::new(),
            },
        };

        // --- Image (Z-Image) ---
        let status_dir = PathBuf::from(var("STATUS_DIR", "/workspace/status"));
        let hf_home = var("HF_HOME", "/workspace/.cache/hf");

        let image = ServiceConfig {
            label: "Z-Image".to_string(),
            jobs_root: PathBuf::from(var("ZIMAGE_JOBS_ROOT", "/workspace/jobs/zimage")),
            ready_flag: path_or("ZIMAGE_READY_FLAG", status_dir.join("zimage_ready")),
            require_ready: parse_bool("ZIMAGE_REQUIRE_READY", &var("ZIMAGE_REQUIRE_READY", "true")),
            collaborator: CollaboratorConfig {
                interpreter: var("ZIMAGE_PY", "python3"),
                script: path_or("ZIMAGE_SCRIPT", ovi_root.join("tools").join("zimage.py")),
                root: ovi_root.clone(),
                extra_env: vec![("HF_HOME".to_string(), hf_home)],
            },
        };

        let exports_dir = PathBuf::from(var("EXPORTS_DIR", "/workspace/exports"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            ovi_root,
            ckpt_dir,
            run_base,
            exports_dir,
            video,
            image,
        }
    }

    /// Startup sanity check for the video collaborator: its root, entry
    /// script and base run config must all exist.
    pub fn check_video(&self) -> Result<(), String> {
        self.video.collaborator.check()?;
        if !self.run_base.is_file() {
            return Err(format!("base run config missing: {}", self.run_base.display()));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        other => panic!("{key} must be a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_follow_workspace_layout() {
        let config = config_with(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.run_base, PathBuf::from("/workspace/Ovi/run.json"));
        assert_eq!(config.ckpt_dir, PathBuf::from("/workspace/Ovi/ckpts"));
        assert_eq!(config.video.jobs_root, PathBuf::from("/workspace/jobs"));
        assert_eq!(
            config.video.collaborator.script,
            PathBuf::from("/workspace/Ovi/inference.py")
        );
        assert!(!config.video.require_ready);
        assert!(config.image.require_ready);
        assert_eq!(
            config.image.ready_flag,
            PathBuf::from("/workspace/status/zimage_ready")
        );
        assert_eq!(
            config.image.collaborator.extra_env,
            vec![("HF_HOME".to_string(), "/workspace/.cache/hf".to_string())]
        );
    }

    #[test]
    fn derived_paths_follow_ovi_root() {
        let config = config_with(&[("OVI_ROOT", "/opt/ovi"), ("STATUS_DIR", "/run/status")]);
        assert_eq!(config.run_base, PathBuf::from("/opt/ovi/run.json"));
        assert_eq!(config.video.collaborator.root, PathBuf::from("/opt/ovi"));
        assert_eq!(
            config.image.collaborator.script,
            PathBuf::from("/opt/ovi/tools/zimage.py")
        );
        assert_eq!(
            config.image.ready_flag,
            PathBuf::from("/run/status/zimage_ready")
        );
    }

    #[test]
    fn explicit_values_win() {
        let config = config_with(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("OVI_PYTHON", "/venv/bin/python"),
            ("OVI_REQUIRE_READY", "yes"),
            ("ZIMAGE_REQUIRE_READY", "0"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.video.collaborator.interpreter, "/venv/bin/python");
        assert!(config.video.require_ready);
        assert!(!config.image.require_ready);
    }

    #[test]
    #[should_panic(expected = "PORT must be a valid u16")]
    fn invalid_port_panics() {
        config_with(&[("PORT", "not-a-port")]);
    }

    #[test]
    fn check_video_reports_missing_run_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("inference.py"), "").unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let config = config_with(&[("OVI_ROOT", root.as_str())]);

        let err = config.check_video().unwrap_err();
        assert!(err.contains("run.json"));

        std::fs::write(dir.path().join("run.json"), "{}").unwrap();
        assert!(config.check_video().is_ok());
    }
}
