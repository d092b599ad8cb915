//! Shallow key-by-key overlay of caller overrides onto a config template.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Caller-supplied overrides: a JSON object applied on top of a template.
pub type Overrides = Map<String, Value>;

/// Overwrite `template` with every entry of `overrides` (later keys win).
///
/// Keys listed in `protected` belong to the orchestrator (job-owned paths)
/// and are rejected rather than silently replaced. The template is left
/// untouched when any protected key is present.
pub fn apply_overrides(
    template: &mut Map<String, Value>,
    overrides: &Overrides,
    protected: &[&str],
) -> Result<(), CoreError> {
    let mut blocked: Vec<&str> = overrides
        .keys()
        .map(String::as_str)
        .filter(|k| protected.contains(k))
        .collect();

    if !blocked.is_empty() {
        blocked.sort_unstable();
        return Err(CoreError::Validation(format!(
            "overrides may not set orchestrator-owned keys: {}",
            blocked.join(", ")
        )));
    }

    for (key, value) in overrides {
        template.insert(key.clone(), value.clone());
    }
    Ok(())
}
