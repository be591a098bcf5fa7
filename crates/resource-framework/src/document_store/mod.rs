//! # Document-Store Adapter
//!
//! [`DocumentStore`] implements [`DataSource`] on top of a [`DocumentCollection`], the minimal
//! driver capability of a document database collection. Queries are translated with
//! [`CriteriaTranslator`]; identities are remapped between the public `id` field and the store's
//! native identity field (`_id` by default).
//!
//! Query calls can be observed: listeners registered with [`DocumentStore::observe`] see every
//! [`QueryEvent`] (`query.pre`, `query.criteria`, `query.post`) in registration order.
//!
//! With the `mongodb` feature enabled, [`DocumentCollection`] is implemented for
//! `mongodb::Collection<bson::Document>`.

#[cfg(feature = "mongodb")]
mod mongo;

use crate::criteria::{Criteria, CriteriaTranslator};
use crate::data_source::DataSource;
use crate::error::ResourceError;
use crate::query::Query;
use crate::record::{Record, RecordId, ID_FIELD};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Driver capability of one document collection.
///
/// Selectors and documents use the store's native identity field.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Finds every document matching `criteria`, applying its sort and pagination.
    async fn find_matching(&self, criteria: &Criteria) -> Result<Vec<Record>, ResourceError>;

    /// Finds the first document matching `selector`.
    async fn find_first(&self, selector: &Record) -> Result<Option<Record>, ResourceError>;

    /// Inserts `document` and returns its identity (assigned by the store when absent).
    async fn insert_document(
        &self,
        document: Record,
        options: &InsertOptions,
    ) -> Result<Value, ResourceError>;

    /// Applies the update document (e.g. `{"$set": ...}`) to the documents matching `selector`.
    async fn update_documents(
        &self,
        selector: &Record,
        update: &Record,
        options: &UpdateOptions,
    ) -> Result<(), ResourceError>;

    /// Removes the documents matching `selector`.
    async fn remove_documents(
        &self,
        selector: &Record,
        options: &RemoveOptions,
    ) -> Result<(), ResourceError>;
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Configuration of a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Native identity field of the collection.
    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    #[serde(default)]
    pub insert: InsertOptions,

    #[serde(default)]
    pub update: UpdateOptions,

    #[serde(default)]
    pub remove: RemoveOptions,
}

/// Options passed with every insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOptions {
    /// Wait for the store to acknowledge the write.
    #[serde(default = "default_true")]
    pub safe: bool,
    /// Wait for the write to reach the journal.
    #[serde(default = "default_true")]
    pub fsync: bool,
}

/// Options passed with every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Insert when nothing matches.
    #[serde(default)]
    pub upsert: bool,
    /// Update every match instead of the first one.
    #[serde(default)]
    pub multiple: bool,
}

/// Options passed with every removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOptions {
    /// Remove only the first match.
    #[serde(default = "default_true")]
    pub just_one: bool,
}

fn default_identity_field() -> String {
    "_id".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            identity_field: default_identity_field(),
            insert: InsertOptions::default(),
            update: UpdateOptions::default(),
            remove: RemoveOptions::default(),
        }
    }
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            safe: default_true(),
            fsync: default_true(),
        }
    }
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self {
            just_one: default_true(),
        }
    }
}

// =============================================================================
// QUERY EVENTS
// =============================================================================

/// One stage of [`DocumentStore::query`](DataSource::query).
#[derive(Debug)]
pub enum QueryEvent<'a> {
    /// Before the query is translated.
    Pre { query: &'a Query },
    /// The criteria about to be sent to the collection.
    Criteria {
        query: &'a Query,
        criteria: &'a Criteria,
    },
    /// The matching records, already using the public `id` field.
    Post {
        query: &'a Query,
        criteria: &'a Criteria,
        records: &'a [Record],
    },
}

impl QueryEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pre { .. } => "query.pre",
            Self::Criteria { .. } => "query.criteria",
            Self::Post { .. } => "query.post",
        }
    }

    pub fn query(&self) -> &Query {
        match self {
            Self::Pre { query } | Self::Criteria { query, .. } | Self::Post { query, .. } => query,
        }
    }
}

impl fmt::Display for QueryEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A query observer.
pub type QueryListener = dyn Fn(&QueryEvent<'_>) + Send + Sync;

// =============================================================================
// DATA SOURCE
// =============================================================================

/// A [`DataSource`] backed by a document collection.
pub struct DocumentStore<C: DocumentCollection> {
    collection: C,
    config: DocumentStoreConfig,
    translator: CriteriaTranslator,
    listeners: Vec<Arc<QueryListener>>,
}

impl<C: DocumentCollection> DocumentStore<C> {
    pub fn new(collection: C) -> Self {
        Self::with_config(collection, DocumentStoreConfig::default())
    }

    pub fn with_config(collection: C, config: DocumentStoreConfig) -> Self {
        Self {
            collection,
            config,
            translator: CriteriaTranslator::new(),
            listeners: Vec::new(),
        }
    }

    /// Registers a listener for every [`QueryEvent`].
    pub fn observe<F>(mut self, listener: F) -> Self
    where
        F: Fn(&QueryEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, event: QueryEvent<'_>) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    fn selector(&self, id: &RecordId) -> Record {
        Record::from_iter([(self.config.identity_field.clone(), id.to_value())])
    }

    /// Native identity field -> `id`.
    fn to_public(&self, mut record: Record) -> Record {
        if let Some(identity) = record.remove(&self.config.identity_field) {
            record.insert(ID_FIELD.to_string(), identity);
        }
        record
    }

    /// `id` -> native identity field.
    fn to_native(&self, mut record: Record) -> Record {
        if let Some(identity) = record.remove(ID_FIELD) {
            record.insert(self.config.identity_field.clone(), identity);
        }
        record
    }
}

#[async_trait]
impl<C: DocumentCollection> DataSource for DocumentStore<C> {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, ResourceError> {
        self.notify(QueryEvent::Pre { query });
        let criteria = self.translator.translate(query);
        self.notify(QueryEvent::Criteria {
            query,
            criteria: &criteria,
        });
        debug!(?criteria, "Querying document collection");

        let documents = self.collection.find_matching(&criteria).await?;
        let records: Vec<Record> = documents.into_iter().map(|d| self.to_public(d)).collect();
        self.notify(QueryEvent::Post {
            query,
            criteria: &criteria,
            records: &records,
        });
        Ok(records)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>, ResourceError> {
        let document = self.collection.find_first(&self.selector(id)).await?;
        Ok(document.map(|d| self.to_public(d)))
    }

    async fn create(&self, record: Record) -> Result<Record, ResourceError> {
        let mut document = self.to_native(record);
        let identity = self
            .collection
            .insert_document(document.clone(), &self.config.insert)
            .await?;
        document.insert(self.config.identity_field.clone(), identity);
        Ok(self.to_public(document))
    }

    async fn update(&self, id: &RecordId, mut fields: Record) -> Result<Record, ResourceError> {
        // the identity is immutable in the store
        fields.remove(ID_FIELD);
        fields.remove(&self.config.identity_field);

        let update = Record::from_iter([("$set".to_string(), Value::Object(fields))]);
        self.collection
            .update_documents(&self.selector(id), &update, &self.config.update)
            .await?;

        match self.get(id).await? {
            Some(record) => Ok(record),
            None => {
                warn!(%id, "Update targeted a missing document");
                Err(ResourceError::NotFound(format!(
                    "Cannot update; record \"{id}\" does not exist"
                )))
            }
        }
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, ResourceError> {
        self.collection
            .remove_documents(&self.selector(id), &self.config.remove)
            .await?;
        Ok(true)
    }
}
