//! Single-image jobs driven by a `request.json` parameter file.
//!
//! Unlike the video profile, the known generation parameters are typed and
//! range-checked after overrides are applied. Unknown keys are passed
//! through to the collaborator untouched.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{render_json, JobArtifacts, JobProfile, JobRequest};
use crate::error::CoreError;
use crate::job::JobLayout;
use crate::overrides::apply_overrides;

/// File name the collaborator writes inside the output directory.
pub const OUTPUT_FILE_NAME: &str = "out.png";

const PROTECTED: &[&str] = &["prompt", "output_dir", "out_path"];

pub const MIN_DIMENSION: i64 = 256;
pub const MAX_DIMENSION: i64 = 2048;
pub const MAX_STEPS: i64 = 30;
pub const MAX_GUIDANCE_SCALE: f64 = 20.0;

/// Known generation parameters, validated after overrides are applied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageParams {
    pub width: i64,
    pub height: i64,
    pub steps: i64,
    pub guidance_scale: f64,
    pub seed: Option<i64>,
}

impl ImageParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        check_range("width", self.width, MIN_DIMENSION, MAX_DIMENSION)?;
        check_range("height", self.height, MIN_DIMENSION, MAX_DIMENSION)?;
        check_range("steps", self.steps, 1, MAX_STEPS)?;
        if !(0.0..=MAX_GUIDANCE_SCALE).contains(&self.guidance_scale) {
            return Err(CoreError::Validation(format!(
                "guidance_scale must be between 0 and {MAX_GUIDANCE_SCALE}, got {}",
                self.guidance_scale
            )));
        }
        if let Some(seed) = self.seed {
            if seed < 0 {
                return Err(CoreError::Validation(format!(
                    "seed must be non-negative, got {seed}"
                )));
            }
        }
        Ok(())
    }
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), CoreError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )))
    }
}

fn default_params() -> Map<String, Value> {
    match json!({
        "width": 768,
        "height": 768,
        "steps": 9,
        "guidance_scale": 0.0,
        "seed": 42,
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Profile for the single-image collaborator.
#[derive(Debug, Clone, Default)]
pub struct ImageProfile;

impl JobProfile for ImageProfile {
    fn name(&self) -> &'static str {
        "zimage"
    }

    fn config_file_name(&self) -> &'static str {
        "request.json"
    }

    fn input_file_name(&self) -> &'static str {
        "prompt.txt"
    }

    fn artifact_extension(&self) -> &'static str {
        "png"
    }

    fn protected_keys(&self) -> &'static [&'static str] {
        PROTECTED
    }

    fn build(&self, request: &JobRequest, layout: &JobLayout) -> Result<JobArtifacts, CoreError> {
        let mut config = default_params();
        apply_overrides(&mut config, &request.overrides, PROTECTED)?;

        let params: ImageParams = serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| CoreError::Validation(format!("invalid image parameters: {e}")))?;
        params.validate()?;

        let out_path = layout.output_dir.join(OUTPUT_FILE_NAME);
        config.insert("prompt".into(), Value::String(request.prompt.clone()));
        config.insert(
            "output_dir".into(),
            Value::String(layout.output_dir.to_string_lossy().into_owned()),
        );
        config.insert(
            "out_path".into(),
            Value::String(out_path.to_string_lossy().into_owned()),
        );

        Ok(JobArtifacts {
            config: render_json(config)?,
            input: request.prompt.clone().into_bytes(),
        })
    }
}
