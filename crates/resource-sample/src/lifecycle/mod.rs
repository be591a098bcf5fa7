//! # Blog System
//!
//! [`BlogSystem`] is the application-facing layer over the entry resource. It turns the
//! framework's data-shaped results into blog errors:
//!
//! - [`WriteOutcome::ValidationFailed`] becomes [`EntryError::Invalid`]
//! - a missing entry becomes [`EntryError::NotFound`]
//! - a vetoed delete becomes [`EntryError::Published`]
//!
//! It also owns the blog's listing query. [`listing_query`] builds the storage-agnostic
//! [`Query`]; any [`DataSource`] can run it, and [`CriteriaTranslator`] shows what a document
//! store receives:
//!
//! ```rust
//! use resource_framework::CriteriaTranslator;
//! use resource_sample::lifecycle::listing_query;
//! use serde_json::json;
//!
//! let query = listing_query(Some("matthew"), 10, 0);
//! let criteria = CriteriaTranslator::new().translate(&query);
//! assert_eq!(criteria.filter["author"], json!("matthew"));
//! assert_eq!(criteria.limit, Some(10));
//! ```

use crate::entry_resource::{self, listeners, EntryError, EntryResource};
use crate::model::BlogEntry;
use resource_framework::mock::MockDataSource;
use resource_framework::{
    CriteriaTranslator, DataSource, Entity, Query, ResultCollection, Spec, Target, WriteOutcome,
};
use serde_json::{json, Value};
use tracing::{debug, info};

/// The blog, wired to a data source.
pub struct BlogSystem<D: DataSource = MockDataSource> {
    pub entries: EntryResource<D>,
}

impl BlogSystem {
    /// An in-memory blog using the system clock.
    pub fn new() -> Self {
        Self::with_data_source(MockDataSource::new(), listeners::system_clock)
    }
}

impl Default for BlogSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DataSource> BlogSystem<D> {
    pub fn with_data_source(data_source: D, clock: listeners::Clock) -> Self {
        Self {
            entries: entry_resource::new(data_source, clock),
        }
    }

    /// Saves a draft.
    pub async fn draft(&self, entry: BlogEntry) -> Result<BlogEntry, EntryError> {
        saved(self.entries.create(Spec::Entity(entry)).await?)
    }

    /// Saves an entry as public and non-draft.
    pub async fn publish(&self, mut entry: BlogEntry) -> Result<BlogEntry, EntryError> {
        entry.is_draft = false;
        entry.is_public = true;
        let entry = saved(self.entries.create(Spec::Entity(entry)).await?)?;
        info!(id = %entry.id, "Published");
        Ok(entry)
    }

    pub async fn entry(&self, slug: &str) -> Result<BlogEntry, EntryError> {
        self.entries
            .get(slug)
            .await?
            .ok_or_else(|| EntryError::NotFound(slug.to_string()))
    }

    /// Applies a partial edit.
    pub async fn revise(&self, slug: &str, fields: Value) -> Result<BlogEntry, EntryError> {
        match self.entries.update(slug, fields).await {
            Ok(outcome) => saved(outcome),
            Err(resource_framework::ResourceError::NotFound(_)) => {
                Err(EntryError::NotFound(slug.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Turns an entry back into a private draft.
    pub async fn unpublish(&self, slug: &str) -> Result<BlogEntry, EntryError> {
        self.revise(slug, json!({ "is_draft": true, "is_public": false }))
            .await
    }

    /// Deletes an entry. Published entries are protected.
    pub async fn remove(&self, slug: &str) -> Result<(), EntryError> {
        let entry = self.entry(slug).await?;
        let published = entry.is_published();
        if self.entries.delete(Target::Entity(entry)).await? {
            info!(id = slug, "Removed");
            Ok(())
        } else if published {
            Err(EntryError::Published(slug.to_string()))
        } else {
            Err(EntryError::NotFound(slug.to_string()))
        }
    }

    /// Runs [`listing_query`] against the data source. Get-all listeners are not involved.
    pub async fn listing(
        &self,
        author: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<ResultCollection<BlogEntry>, EntryError> {
        let query = listing_query(author, limit, offset);
        debug!(
            criteria = ?CriteriaTranslator::new().translate(&query),
            "Listing entries"
        );
        // resource hooks only wrap the unfiltered get-all; filtered listings go straight to the
        // data source but still load entries through the resource's factory
        let records = self.entries.data_source().query(&query).await?;
        Ok(ResultCollection::new(records, self.entries.factory()))
    }

    /// Every entry, unfiltered.
    pub async fn archive(&self) -> Result<Vec<BlogEntry>, EntryError> {
        let items = self.entries.get_all().await?;
        Ok(items.iter().cloned().collect())
    }
}

/// Public, non-draft entries, newest first, optionally by one author.
pub fn listing_query(author: Option<&str>, limit: i64, offset: i64) -> Query {
    let query = Query::new()
        .and_where("is_draft", "=", false)
        .and_where("is_public", "=", true);
    let query = match author {
        Some(author) => query.and_where("author", "=", author),
        None => query,
    };
    query.sort("created", "DESC").limit(limit, offset)
}

fn saved(outcome: WriteOutcome<BlogEntry>) -> Result<BlogEntry, EntryError> {
    match outcome {
        WriteOutcome::Saved(entry) => {
            debug!(id = ?entry.id(), "Saved");
            Ok(entry)
        }
        WriteOutcome::ValidationFailed(errors) => Err(EntryError::Invalid(errors)),
    }
}
