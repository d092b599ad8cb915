//! Job id validation and generation.
//!
//! Ids double as directory names under the jobs root, so the charset is
//! restricted to ASCII alphanumerics, `-` and `_`.

use crate::error::CoreError;

/// Maximum length of a job id after sanitization.
pub const MAX_JOB_ID_LEN: usize = 64;

/// Length of a generated job id (lowercase hex).
pub const GENERATED_JOB_ID_LEN: usize = 12;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Strip disallowed characters and truncate to [`MAX_JOB_ID_LEN`].
///
/// Fails with [`CoreError::Validation`] when nothing is left.
pub fn sanitize_job_id(raw: &str) -> Result<String, CoreError> {
    let clean: String = raw.chars().filter(|c| is_allowed(*c)).take(MAX_JOB_ID_LEN).collect();
    if clean.is_empty() {
        return Err(CoreError::Validation(format!("invalid job_id '{raw}'")));
    }
    Ok(clean)
}

/// A fresh random id of [`GENERATED_JOB_ID_LEN`] hex characters.
pub fn generate_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_JOB_ID_LEN);
    id
}

/// Use the caller's id when one was supplied, otherwise generate one.
///
/// An empty string counts as "not supplied".
pub fn resolve_job_id(requested: Option<&str>) -> Result<String, CoreError> {
    match requested {
        Some(raw) if !raw.is_empty() => sanitize_job_id(raw),
        _ => Ok(generate_job_id()),
    }
}

/// `true` if `id` could have come out of [`sanitize_job_id`] unchanged.
///
/// Used before touching the filesystem with an id taken from a request path.
pub fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_JOB_ID_LEN && id.chars().all(is_allowed)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_job_id("my job/../1").unwrap(), "myjob1");
        assert_eq!(sanitize_job_id("run-42_final").unwrap(), "run-42_final");
    }

    #[test]
    fn sanitize_truncates_to_max_len() {
        let long = "a".repeat(200);
        assert_eq!(sanitize_job_id(&long).unwrap().len(), MAX_JOB_ID_LEN);
    }

    #[test]
    fn sanitize_rejects_empty_result() {
        assert_matches!(sanitize_job_id("../../"), Err(CoreError::Validation(_)));
        assert_matches!(sanitize_job_id("äöü"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let a = generate_job_id();
        let b = generate_job_id();
        assert_eq!(a.len(), GENERATED_JOB_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_generates_when_absent_or_empty() {
        assert_eq!(resolve_job_id(None).unwrap().len(), GENERATED_JOB_ID_LEN);
        assert_eq!(resolve_job_id(Some("")).unwrap().len(), GENERATED_JOB_ID_LEN);
        assert_eq!(resolve_job_id(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn validity_check() {
        assert!(is_valid_job_id("abc-123_X"));
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id(".."));
        assert!(!is_valid_job_id("a/b"));
        assert!(!is_valid_job_id(&"a".repeat(65)));
    }
}
