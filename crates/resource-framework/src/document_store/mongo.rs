//! [`DocumentCollection`] for the official MongoDB driver.
//!
//! Records are converted to BSON with serde. Object ids read back from the store are rendered as
//! their hex string; other identities pass through unchanged. Going the other way, an `_id` that
//! is a 24-digit hex string is sent as an object id, in selectors and inserted documents alike,
//! so store-assigned identities can be looked up again.

use super::{DocumentCollection, InsertOptions, RemoveOptions, UpdateOptions};
use crate::criteria::Criteria;
use crate::error::ResourceError;
use crate::record::Record;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document};
use mongodb::options::{Acknowledgment, WriteConcern};
use mongodb::Collection;
use serde_json::Value;

const OBJECT_ID: &str = "_id";

fn to_document(record: &Record) -> Result<Document, ResourceError> {
    bson::to_document(record).map_err(ResourceError::backend)
}

/// Converts a hex `_id` back into the object id it was rendered from.
fn with_object_id(record: &Record) -> Result<Document, ResourceError> {
    let mut document = to_document(record)?;
    let parsed = match document.get(OBJECT_ID) {
        Some(Bson::String(hex)) if hex.len() == 24 => ObjectId::parse_str(hex).ok(),
        _ => None,
    };
    if let Some(id) = parsed {
        document.insert(OBJECT_ID, id);
    }
    Ok(document)
}

fn write_concern(options: &InsertOptions) -> WriteConcern {
    let nodes = if options.safe { 1 } else { 0 };
    WriteConcern::builder()
        .w(Acknowledgment::Nodes(nodes))
        .journal(options.fsync)
        .build()
}

fn to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}

fn to_record(document: Document) -> Record {
    document
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect()
}

#[async_trait]
impl DocumentCollection for Collection<Document> {
    async fn find_matching(&self, criteria: &Criteria) -> Result<Vec<Record>, ResourceError> {
        let mut find = self.find(to_document(&criteria.filter)?);
        if let Some(sort) = &criteria.sort {
            find = find.sort(to_document(sort)?);
        }
        if let Some(skip) = criteria.skip {
            find = find.skip(u64::try_from(skip).unwrap_or(0));
        }
        if let Some(limit) = criteria.limit {
            find = find.limit(limit);
        }

        let documents: Vec<Document> = find
            .await
            .map_err(ResourceError::backend)?
            .try_collect()
            .await
            .map_err(ResourceError::backend)?;
        Ok(documents.into_iter().map(to_record).collect())
    }

    async fn find_first(&self, selector: &Record) -> Result<Option<Record>, ResourceError> {
        let document = self
            .find_one(with_object_id(selector)?)
            .await
            .map_err(ResourceError::backend)?;
        Ok(document.map(to_record))
    }

    async fn insert_document(
        &self,
        document: Record,
        options: &InsertOptions,
    ) -> Result<Value, ResourceError> {
        let result = self
            .insert_one(with_object_id(&document)?)
            .write_concern(write_concern(options))
            .await
            .map_err(ResourceError::backend)?;
        Ok(to_json(result.inserted_id))
    }

    async fn update_documents(
        &self,
        selector: &Record,
        update: &Record,
        options: &UpdateOptions,
    ) -> Result<(), ResourceError> {
        let selector = with_object_id(selector)?;
        let update = to_document(update)?;
        let result = if options.multiple {
            self.update_many(selector, update).upsert(options.upsert).await
        } else {
            self.update_one(selector, update).upsert(options.upsert).await
        };
        result.map(|_| ()).map_err(ResourceError::backend)
    }

    async fn remove_documents(
        &self,
        selector: &Record,
        options: &RemoveOptions,
    ) -> Result<(), ResourceError> {
        let selector = with_object_id(selector)?;
        let result = if options.just_one {
            self.delete_one(selector).await
        } else {
            self.delete_many(selector).await
        };
        result.map(|_| ()).map_err(ResourceError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_assigned_object_id_round_trips_through_selector() {
        let assigned = ObjectId::new();
        let public = to_json(Bson::ObjectId(assigned));
        assert_eq!(public, json!(assigned.to_hex()));

        let selector = with_object_id(&record(json!({ "_id": public }))).unwrap();
        assert_eq!(selector.get(OBJECT_ID), Some(&Bson::ObjectId(assigned)));
    }

    #[test]
    fn test_other_identities_are_left_alone() {
        for id in [json!("hello-world"), json!(7), json!("zzzzzzzzzzzzzzzzzzzzzzzz")] {
            let selector = with_object_id(&record(json!({ "_id": id.clone() }))).unwrap();
            assert!(!matches!(selector.get(OBJECT_ID), Some(Bson::ObjectId(_))), "{id}");
        }

        let selector = with_object_id(&record(json!({ "slug": "4f1a9c0e8b3d2a1f0e9d8c7b" }))).unwrap();
        assert_eq!(
            selector.get("slug"),
            Some(&Bson::String("4f1a9c0e8b3d2a1f0e9d8c7b".into()))
        );
    }

    #[test]
    fn test_insert_options_map_to_write_concern() {
        let concern = write_concern(&InsertOptions::default());
        assert_eq!(concern.w, Some(Acknowledgment::Nodes(1)));
        assert_eq!(concern.journal, Some(true));

        let concern = write_concern(&InsertOptions {
            safe: false,
            fsync: false,
        });
        assert_eq!(concern.w, Some(Acknowledgment::Nodes(0)));
        assert_eq!(concern.journal, Some(false));
    }
}
