//! # Framework Errors
//!
//! This module defines the error type shared by every layer of the framework: the query model,
//! the data sources and the [`Resource`](crate::Resource) orchestrator. Keeping one enum means
//! callers match on the same variants whether a failure came from the mock, the document store
//! or the orchestrator itself.
//!
//! Validation failures are deliberately **not** represented here. They are returned as data via
//! [`WriteOutcome::ValidationFailed`](crate::WriteOutcome::ValidationFailed).

/// Errors that can occur within the resource framework.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Structurally malformed input (bad conjunction, non-object spec).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The targeted record or entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A record with the requested identity is already stored.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// The backing store reported a failure.
    #[error("Backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl ResourceError {
    /// Wraps a driver error.
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }
}
