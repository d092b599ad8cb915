#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] on a job id.
    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Job",
            id: id.into(),
        }
    }
}
