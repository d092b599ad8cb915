//! Sentinel-file readiness probe.
//!
//! An out-of-band provisioning step creates the flag file once model assets
//! are in place. The probe only stats it; nothing is cached.

use std::path::PathBuf;

use serde::Serialize;

/// Reports whether upstream model assets are provisioned.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    label: String,
    flag: PathBuf,
}

/// Serializable readiness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub flag: String,
    pub message: String,
}

impl ReadinessProbe {
    /// `label` names the collaborator in the human-readable message.
    pub fn new(label: impl Into<String>, flag: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            flag: flag.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.flag.exists()
    }

    pub fn status(&self) -> ReadinessStatus {
        let ready = self.is_ready();
        let message = if ready {
            format!("{} is ready.", self.label)
        } else {
            format!("{} is still being prepared.", self.label)
        };
        ReadinessStatus {
            ready,
            flag: self.flag.display().to_string(),
            message,
        }
    }
}
