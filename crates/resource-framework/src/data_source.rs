//! # DataSource Trait
//!
//! The storage capability consumed by [`Resource`](crate::Resource). Implementations exchange
//! [`Record`]s whose identity lives under `id`; translating that to the store's native identity
//! field is the implementation's job.
//!
//! Two implementations ship with the framework:
//! - [`MockDataSource`](crate::mock::MockDataSource): in-memory, for tests and prototyping.
//! - [`DocumentStore`](crate::document_store::DocumentStore): a document-store adapter that
//!   translates queries with [`CriteriaTranslator`](crate::CriteriaTranslator).

use crate::error::ResourceError;
use crate::query::Query;
use crate::record::{Record, RecordId};
use async_trait::async_trait;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Runs `query`. No match is an empty list, not an error.
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ResourceError>;

    /// Point lookup. A missing record is `None`, not an error.
    async fn get(&self, id: &RecordId) -> Result<Option<Record>, ResourceError>;

    /// Stores a new record and returns it with its storage identity under `id`.
    ///
    /// An `id` carried by `record` becomes the storage identity.
    async fn create(&self, record: Record) -> Result<Record, ResourceError>;

    /// Merges `fields` into the stored record and returns the result.
    ///
    /// Fails with [`ResourceError::NotFound`] when nothing is stored under `id`.
    async fn update(&self, id: &RecordId, fields: Record) -> Result<Record, ResourceError>;

    /// Removes the record. Removing a missing record still reports `true`.
    async fn delete(&self, id: &RecordId) -> Result<bool, ResourceError>;
}
