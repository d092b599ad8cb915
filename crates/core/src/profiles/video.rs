//! Long-form video jobs driven by a `run.json` config file.
//!
//! The config is built from a base template on disk. The orchestrator owns
//! `text_prompt` (pointing at the job's `prompt.csv`) and `output_dir`.

use std::path::PathBuf;

use serde_json::{Map, Value};

use super::{render_json, JobArtifacts, JobProfile, JobRequest};
use crate::error::CoreError;
use crate::job::JobLayout;
use crate::overrides::apply_overrides;

/// Key in `run.json` naming the prompt CSV.
pub const KEY_TEXT_PROMPT: &str = "text_prompt";

/// Key in `run.json` naming the output directory.
pub const KEY_OUTPUT_DIR: &str = "output_dir";

const PROTECTED: &[&str] = &[KEY_TEXT_PROMPT, KEY_OUTPUT_DIR];

/// Profile for the video inference collaborator.
#[derive(Debug, Clone)]
pub struct OviProfile {
    base_config: PathBuf,
}

impl OviProfile {
    /// `base_config` is re-read on every submission, so edits take effect
    /// without a restart.
    pub fn new(base_config: impl Into<PathBuf>) -> Self {
        Self {
            base_config: base_config.into(),
        }
    }

    fn load_template(&self) -> Result<Map<String, Value>, CoreError> {
        let raw = std::fs::read(&self.base_config).map_err(|e| {
            CoreError::Internal(format!(
                "failed to read base config {}: {e}",
                self.base_config.display()
            ))
        })?;
        match serde_json::from_slice(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CoreError::Internal(format!(
                "base config {} is not a JSON object",
                self.base_config.display()
            ))),
            Err(e) => Err(CoreError::Internal(format!(
                "base config {} is not valid JSON: {e}",
                self.base_config.display()
            ))),
        }
    }
}

impl JobProfile for OviProfile {
    fn name(&self) -> &'static str {
        "ovi"
    }

    fn config_file_name(&self) -> &'static str {
        "run.json"
    }

    fn input_file_name(&self) -> &'static str {
        "prompt.csv"
    }

    fn artifact_extension(&self) -> &'static str {
        "mp4"
    }

    fn protected_keys(&self) -> &'static [&'static str] {
        PROTECTED
    }

    fn build(&self, request: &JobRequest, layout: &JobLayout) -> Result<JobArtifacts, CoreError> {
        let mut config = self.load_template()?;
        apply_overrides(&mut config, &request.overrides, PROTECTED)?;

        config.insert(
            KEY_TEXT_PROMPT.into(),
            Value::String(layout.input_path.to_string_lossy().into_owned()),
        );
        config.insert(
            KEY_OUTPUT_DIR.into(),
            Value::String(layout.output_dir.to_string_lossy().into_owned()),
        );

        Ok(JobArtifacts {
            config: render_json(config)?,
            input: prompt_csv(&request.prompt).into_bytes(),
        })
    }
}

/// Single-column CSV with a `text_prompt` header, CRLF line endings.
fn prompt_csv(prompt: &str) -> String {
    format!("{KEY_TEXT_PROMPT}\r\n{}\r\n", csv_field(prompt))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn write_base(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("run.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn layout() -> JobLayout {
        JobLayout::new(PathBuf::from("/jobs/j1"), "run.json", "prompt.csv")
    }

    #[test]
    fn build_sets_job_paths_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_base(
            &dir,
            r#"{"text_prompt": "example.csv", "output_dir": "out", "sample_steps": 50, "seed": 100}"#,
        );
        let profile = OviProfile::new(base);

        let mut request = JobRequest::new("a cat");
        request.overrides.insert("sample_steps".into(), json!(20));

        let artifacts = profile.build(&request, &layout()).unwrap();
        let config: Value = serde_json::from_slice(&artifacts.config).unwrap();
        assert_eq!(config["text_prompt"], "/jobs/j1/prompt.csv");
        assert_eq!(config["output_dir"], "/jobs/j1/output");
        assert_eq!(config["sample_steps"], 20);
        assert_eq!(config["seed"], 100);
    }

    #[test]
    fn build_rejects_output_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let profile = OviProfile::new(write_base(&dir, "{}"));
        let mut request = JobRequest::new("a cat");
        request.overrides.insert("output_dir".into(), json!("/etc"));
        assert_matches!(
            profile.build(&request, &layout()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn build_fails_on_non_object_template() {
        let dir = tempfile::tempdir().unwrap();
        let profile = OviProfile::new(write_base(&dir, "[1, 2]"));
        assert_matches!(
            profile.build(&JobRequest::new("x"), &layout()),
            Err(CoreError::Internal(_))
        );
    }

    #[test]
    fn build_fails_on_missing_template() {
        let profile = OviProfile::new("/nonexistent/run.json");
        assert_matches!(
            profile.build(&JobRequest::new("x"), &layout()),
            Err(CoreError::Internal(_))
        );
    }

    #[test]
    fn prompt_csv_quotes_when_needed() {
        assert_eq!(prompt_csv("plain"), "text_prompt\r\nplain\r\n");
        assert_eq!(
            prompt_csv("a, \"quoted\" prompt"),
            "text_prompt\r\n\"a, \"\"quoted\"\" prompt\"\r\n"
        );
    }
}
