//! # Mocking Utilities
//!
//! [`MockDataSource`] is an in-memory [`DataSource`] for tests and prototyping. It keeps records in
//! a map keyed by [`RecordId`] and answers queries from canned responses registered up front,
//! without interpreting predicates.
//!
//! ## Canned queries
//!
//! ```rust
//! # use resource_framework::{mock::MockDataSource, DataSource, Query};
//! # use serde_json::json;
//! # tokio_test_block(async {
//! let mock = MockDataSource::new();
//! let query = Query::new().and_where("foo", "=", "bar").limit(10, 10);
//! mock.when(query.clone())
//!     .return_records(vec![json!({ "id": 1, "foo": "bar" }).as_object().cloned().unwrap()]);
//!
//! assert_eq!(mock.query(&query).await.unwrap().len(), 1);
//! assert!(mock.query(&Query::new()).await.unwrap().is_empty());
//! assert_eq!(mock.queries().len(), 2);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```
//!
//! Matching is by [`Query`] equality: same predicates in the same order, same pagination and sort.
//! Unmatched queries return an empty list.

use crate::data_source::DataSource;
use crate::error::ResourceError;
use crate::query::Query;
use crate::record::{Record, RecordId, ID_FIELD};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An in-memory data source with canned query responses.
#[derive(Debug, Default)]
pub struct MockDataSource {
    responses: Mutex<Vec<(Query, Vec<Record>)>>,
    received: Mutex<Vec<Query>>,
    store: Mutex<BTreeMap<RecordId, Record>>,
}

impl MockDataSource {
    /// Creates an empty mock with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response for `query`.
    pub fn when(&self, query: Query) -> QueryExpectationBuilder<'_> {
        QueryExpectationBuilder { mock: self, query }
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<Query> {
        self.received.lock().clone()
    }

    /// Number of records currently stored.
    pub fn stored(&self) -> usize {
        self.store.lock().len()
    }

    fn next_free_id(store: &BTreeMap<RecordId, Record>) -> RecordId {
        let mut candidate = store.len() as i64 + 1;
        while store.contains_key(&RecordId::Int(candidate)) {
            candidate += 1;
        }
        RecordId::Int(candidate)
    }
}

/// Builder for canned `query` responses.
pub struct QueryExpectationBuilder<'a> {
    mock: &'a MockDataSource,
    query: Query,
}

impl QueryExpectationBuilder<'_> {
    /// Answers the query with `records`. Registering an equal query again replaces the answer.
    pub fn return_records(self, records: Vec<Record>) {
        let mut responses = self.mock.responses.lock();
        match responses.iter_mut().find(|(q, _)| *q == self.query) {
            Some((_, existing)) => *existing = records,
            None => responses.push((self.query, records)),
        }
    }
}

// =============================================================================
// DATA SOURCE
// =============================================================================

#[async_trait]
impl DataSource for MockDataSource {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ResourceError> {
        self.received.lock().push(query.clone());
        let records = self
            .responses
            .lock()
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, records)| records.clone())
            .unwrap_or_default();
        debug!(size = records.len(), "Mock query answered");
        Ok(records)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>, ResourceError> {
        Ok(self.store.lock().get(id).cloned())
    }

    async fn create(&self, mut record: Record) -> Result<Record, ResourceError> {
        let mut store = self.store.lock();
        let id = match RecordId::of(&record) {
            Some(id) => id,
            None => {
                let id = Self::next_free_id(&store);
                record.insert(ID_FIELD.to_string(), id.to_value());
                id
            }
        };
        if store.contains_key(&id) {
            return Err(ResourceError::AlreadyExists(format!(
                "record with id \"{id}\" already exists"
            )));
        }
        store.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &RecordId, fields: Record) -> Result<Record, ResourceError> {
        let mut store = self.store.lock();
        let Some(existing) = store.get_mut(id) else {
            return Err(ResourceError::NotFound(format!(
                "record with id \"{id}\" does not yet exist"
            )));
        };
        existing.extend(fields);
        existing.insert(ID_FIELD.to_string(), id.to_value());
        Ok(existing.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, ResourceError> {
        self.store.lock().remove(id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn paged_query() -> Query {
        Query::new()
            .and_where("foo", "eq", "bar")
            .or_where("bar", "ne", "baz")
            .and_where("baz", ">", 1)
            .limit(10, 10)
    }

    #[tokio::test]
    async fn test_can_mock_queries() {
        let mock = MockDataSource::new();
        let canned = vec![
            record(json!({ "id": 1, "foo": "bar", "bar": "nada", "baz": 2 })),
            record(json!({ "id": 1, "foo": "bar", "bar": "nothing", "baz": 3 })),
        ];
        mock.when(paged_query()).return_records(canned.clone());

        assert_eq!(mock.query(&paged_query()).await.unwrap(), canned);
    }

    #[tokio::test]
    async fn test_unmatched_query_returns_empty() {
        let mock = MockDataSource::new();
        mock.when(paged_query())
            .return_records(vec![record(json!({ "id": 1 }))]);

        let other = Query::new().and_where("foo", "eq", "bar");
        assert!(mock.query(&other).await.unwrap().is_empty());
        assert_eq!(mock.queries(), vec![other]);
    }

    #[tokio::test]
    async fn test_create_uses_id_from_definition() {
        let mock = MockDataSource::new();
        let definition = record(json!({ "id": "foo", "bar": "baz" }));
        let created = mock.create(definition.clone()).await.unwrap();
        assert_eq!(created, definition);
    }

    #[tokio::test]
    async fn test_create_assigns_id_when_missing() {
        let mock = MockDataSource::new();
        let first = mock.create(record(json!({ "bar": "baz" }))).await.unwrap();
        let second = mock.create(record(json!({ "bar": "bat" }))).await.unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert_eq!(mock.stored(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let mock = MockDataSource::new();
        let definition = record(json!({ "id": "foo", "bar": "baz" }));
        mock.create(definition.clone()).await.unwrap();

        let err = mock.create(definition).await.unwrap_err();
        assert!(matches!(err, ResourceError::AlreadyExists(ref m) if m.contains("already exists")));
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let mock = MockDataSource::new();
        let err = mock
            .update(&"foo".into(), record(json!({ "bar": "baz" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(ref m) if m.contains("does not yet exist")));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let mock = MockDataSource::new();
        mock.create(record(json!({ "id": "foo", "bar": "baz" })))
            .await
            .unwrap();

        let updated = mock
            .update(&"foo".into(), record(json!({ "bar": "BAZBAT", "baz": "bat" })))
            .await
            .unwrap();
        assert_eq!(
            Value::Object(updated),
            json!({ "id": "foo", "bar": "BAZBAT", "baz": "bat" })
        );
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let mock = MockDataSource::new();
        let definition = record(json!({ "id": "foo", "bar": "baz" }));
        mock.create(definition.clone()).await.unwrap();

        assert_eq!(mock.get(&"bar".into()).await.unwrap(), None);
        assert_eq!(mock.get(&"foo".into()).await.unwrap(), Some(definition));

        assert!(mock.delete(&"foo".into()).await.unwrap());
        assert!(mock.delete(&"foo".into()).await.unwrap());
        assert_eq!(mock.get(&"foo".into()).await.unwrap(), None);
    }
}
