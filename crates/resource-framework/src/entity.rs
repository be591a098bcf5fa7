//! # Entity Trait
//!
//! The `Entity` trait defines the contract that every resource type (blog entries, users, ...)
//! must implement to be managed by the generic [`Resource`](crate::Resource). It mirrors the
//! record format exchanged with data sources: an entity is populated from a raw record, can be
//! serialized back to one, and knows whether its current state is valid.
//!
//! # Architecture Note
//! By defining a contract that all resource types must satisfy, the CRUD orchestration in
//! [`Resource`](crate::Resource) is written *once* and reused for every entity. Instantiation
//! goes through an entity factory (by default [`Default::default`]) rather than a type name.
//!
//! # Validation
//! Validation is owned by the entity. The orchestrator only asks [`Entity::is_valid`] and, when it
//! fails, hands [`Entity::input_errors`] back to the caller as data.

use crate::record::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait that any resource entity must implement to be managed by `Resource`.
pub trait Entity: Send + Sync + 'static {
    /// The identity of the entity, if it has one yet.
    fn id(&self) -> Option<RecordId>;

    /// Serializes the entity to a raw record (identity under `id`).
    fn to_record(&self) -> Record;

    /// Populates the entity from a raw record.
    ///
    /// Fields absent from `record` keep their current value, so this also applies partial
    /// updates.
    fn from_record(&mut self, record: Record);

    /// Whether the current state passes validation.
    fn is_valid(&self) -> bool;

    /// Field-level validation messages for the current state.
    fn input_errors(&self) -> ValidationErrors;
}

/// Constructs empty entities.
pub type EntityFactory<E> = fn() -> E;

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Result of a write that may be rejected by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<E> {
    /// The entity was persisted and refreshed from the stored record.
    Saved(E),
    /// Validation rejected the entity; nothing was written.
    ValidationFailed(ValidationErrors),
}

impl<E> WriteOutcome<E> {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn saved(self) -> Option<E> {
        match self {
            Self::Saved(entity) => Some(entity),
            Self::ValidationFailed(_) => None,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Saved(_) => None,
            Self::ValidationFailed(errors) => Some(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "required");
        errors.add("title", "too short");
        errors.add("author", "required");

        assert_eq!(errors.field("title"), ["required", "too short"]);
        assert!(errors.field("body").is_empty());
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "author": ["required"], "title": ["required", "too short"] })
        );
    }
}
