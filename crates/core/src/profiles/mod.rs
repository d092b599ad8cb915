//! Job profiles: the pluggable "build external config" step.
//!
//! Every job shares the same record and lifecycle; profiles only differ in
//! which files are rendered into the job directory for the collaborator to
//! consume, which keys of that config the orchestrator owns, and which
//! artifact extension counts as output.

pub mod image;
pub mod video;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::JobLayout;
use crate::overrides::Overrides;

pub use image::ImageProfile;
pub use video::OviProfile;

/// A submission as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    pub prompt: String,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub job_id: Option<String>,
}

impl JobRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Reject requests that can never produce a job.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation("prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// Rendered files to be written into a new job directory.
#[derive(Debug, Clone)]
pub struct JobArtifacts {
    /// Contents of the config artifact (at [`JobLayout::config_path`]).
    pub config: Vec<u8>,
    /// Contents of the input artifact (at [`JobLayout::input_path`]).
    pub input: Vec<u8>,
}

/// Strategy for one job shape.
pub trait JobProfile: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// File name of the config artifact inside the job directory.
    fn config_file_name(&self) -> &'static str;

    /// File name of the prompt/request artifact inside the job directory.
    fn input_file_name(&self) -> &'static str;

    /// Extension (without dot) of the files the collaborator produces.
    fn artifact_extension(&self) -> &'static str;

    /// Config keys the orchestrator writes itself; overrides may not set them.
    fn protected_keys(&self) -> &'static [&'static str];

    /// Render the config and input artifacts for a job.
    fn build(&self, request: &JobRequest, layout: &JobLayout) -> Result<JobArtifacts, CoreError>;

    /// Layout for a job directory using this profile's file names.
    fn layout(&self, job_dir: std::path::PathBuf) -> JobLayout {
        JobLayout::new(job_dir, self.config_file_name(), self.input_file_name())
    }
}

/// Serialize a config object the way collaborators expect (pretty JSON).
pub(crate) fn render_json(
    config: serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec_pretty(&serde_json::Value::Object(config))
        .map_err(|e| CoreError::Internal(format!("failed to render config: {e}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn request_requires_prompt() {
        assert_matches!(JobRequest::new("   ").validate(), Err(CoreError::Validation(_)));
        assert!(JobRequest::new("a monkey eating schnitzel").validate().is_ok());
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: JobRequest = serde_json::from_str(r#"{"prompt": "x"}"#).unwrap();
        assert!(req.overrides.is_empty());
        assert!(req.job_id.is_none());
    }
}
