//! # Resource Framework
//!
//! This crate provides the building blocks for storage-agnostic resources: a query model that
//! says *what* to fetch, data sources that know *how* to fetch it, and a generic
//! [`Resource`] that adds validation and extension hooks around every CRUD operation.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into four layers:
//!
//! 1. **Query Layer** ([`Query`], [`Predicate`]) - ordered predicates, one sort, a pagination window
//! 2. **Storage Layer** ([`DataSource`]) - raw records in and out; [`CriteriaTranslator`] turns a
//!    query into document-store criteria for [`DocumentStore`]
//! 3. **Entity Layer** ([`Entity`]) - your domain types, their record form and their validation
//! 4. **Orchestration Layer** ([`Resource`]) - CRUD with pre/post hooks and a lazy
//!    [`ResultCollection`] for bulk reads
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_framework::{mock::MockDataSource, Entity, Record, RecordId, Resource, ValidationErrors};
//! use serde_json::{json, Value};
//!
//! #[derive(Debug, Default)]
//! struct Note {
//!     id: Option<RecordId>,
//!     text: String,
//! }
//!
//! impl Entity for Note {
//!     fn id(&self) -> Option<RecordId> { self.id.clone() }
//!     fn to_record(&self) -> Record {
//!         let mut record = Record::new();
//!         if let Some(id) = &self.id { record.insert("id".into(), id.to_value()); }
//!         record.insert("text".into(), json!(self.text));
//!         record
//!     }
//!     fn from_record(&mut self, record: Record) {
//!         if let Some(id) = RecordId::of(&record) { self.id = Some(id); }
//!         if let Some(Value::String(text)) = record.get("text") { self.text = text.clone(); }
//!     }
//!     fn is_valid(&self) -> bool { !self.text.is_empty() }
//!     fn input_errors(&self) -> ValidationErrors {
//!         let mut errors = ValidationErrors::new();
//!         if self.text.is_empty() { errors.add("text", "required"); }
//!         errors
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let notes = Resource::<Note, _>::new(MockDataSource::new());
//!
//!     let saved = notes.create(json!({ "id": "n1", "text": "hello" })).await.unwrap();
//!     assert!(saved.is_saved());
//!
//!     let rejected = notes.create(json!({ "id": "n2" })).await.unwrap();
//!     assert_eq!(rejected.validation_errors().unwrap().field("text"), ["required"]);
//!
//!     let note = notes.get("n1").await.unwrap().unwrap();
//!     assert_eq!(note.text, "hello");
//! }
//! ```
//!
//! ## Extension Hooks
//!
//! Listeners attached to [`Resource::events`] run before and after every operation and can
//! short-circuit reads, rewrite updates or veto deletions. See [`events`].
//!
//! ## Testing
//!
//! [`mock::MockDataSource`] keeps records in memory and answers queries from canned responses,
//! so everything above the [`DataSource`] seam can be tested without a database.

pub mod collection;
pub mod criteria;
pub mod data_source;
pub mod document_store;
pub mod entity;
pub mod error;
pub mod events;
pub mod mock;
pub mod query;
pub mod record;
pub mod resource;
pub mod tracing;

// Re-export core types for convenience
pub use collection::ResultCollection;
pub use criteria::{Criteria, CriteriaTranslator, Operator};
pub use data_source::DataSource;
pub use document_store::{
    DocumentCollection, DocumentStore, DocumentStoreConfig, InsertOptions, QueryEvent, QueryListener,
    RemoveOptions, UpdateOptions,
};
pub use entity::{Entity, EntityFactory, ValidationErrors, WriteOutcome};
pub use error::ResourceError;
pub use events::{
    EventEmitter, EventManager, HookPoint, HookResult, ListenerId, ResourceEvent, Responses,
};
pub use query::{Conjunction, Direction, Predicate, Query, Sort};
pub use record::{Record, RecordId, ID_FIELD};
pub use resource::{Resource, Spec, Target};
