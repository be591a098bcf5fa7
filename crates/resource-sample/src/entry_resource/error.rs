//! Error types for blog entry operations.

use resource_framework::{ResourceError, ValidationErrors};
use thiserror::Error;

/// Errors that can occur during blog entry operations.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The requested entry was not found.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The entry failed validation; nothing was written.
    #[error("Entry validation error: {}", summarize(.0))]
    Invalid(ValidationErrors),

    /// A listener refused to delete the entry.
    #[error("Entry is published and cannot be deleted: {0}")]
    Published(String),

    /// The underlying resource or data source failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

fn summarize(errors: &ValidationErrors) -> String {
    errors
        .fields()
        .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("body", "required");
        errors.add("title", "required");
        errors.add("title", "too short");

        let message = EntryError::Invalid(errors).to_string();
        assert_eq!(
            message,
            "Entry validation error: body: required; title: required, too short"
        );
    }
}
