//! # Result Collections
//!
//! A [`ResultCollection`] wraps the raw records returned by a query and materializes each one into
//! an entity the first time its position is accessed. Materialized entities are cached for the
//! lifetime of the collection; the collection never goes back to storage.

use crate::entity::{Entity, EntityFactory};
use crate::record::Record;
use std::fmt;
use std::sync::OnceLock;

/// Lazy, indexable view over raw records.
pub struct ResultCollection<E: Entity> {
    records: Vec<Record>,
    entities: Vec<OnceLock<E>>,
    factory: EntityFactory<E>,
}

impl<E: Entity> ResultCollection<E> {
    pub fn new(records: Vec<Record>, factory: EntityFactory<E>) -> Self {
        let entities = records.iter().map(|_| OnceLock::new()).collect();
        Self {
            records,
            entities,
            factory,
        }
    }

    /// Builds an already-materialized collection, e.g. for a hook that answers `get-all` itself.
    pub fn from_entities(entities: Vec<E>, factory: EntityFactory<E>) -> Self {
        let records = entities.iter().map(Entity::to_record).collect();
        let entities = entities.into_iter().map(OnceLock::from).collect();
        Self {
            records,
            entities,
            factory,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The entity at `index`, materialized on first access.
    pub fn get(&self, index: usize) -> Option<&E> {
        let record = self.records.get(index)?;
        let slot = &self.entities[index];
        Some(slot.get_or_init(|| {
            let mut entity = (self.factory)();
            entity.from_record(record.clone());
            entity
        }))
    }

    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            collection: self,
            index: 0,
        }
    }

    /// The raw records, as returned by the data source.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Serializes every entity back to a record.
    pub fn to_records(&self) -> Vec<Record> {
        self.iter().map(Entity::to_record).collect()
    }

    /// Replaces the underlying records and drops every materialized entity.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.entities = records.iter().map(|_| OnceLock::new()).collect();
        self.records = records;
    }

    /// Number of entities materialized so far.
    pub fn materialized(&self) -> usize {
        self.entities.iter().filter(|slot| slot.get().is_some()).count()
    }
}

impl<E: Entity> fmt::Debug for ResultCollection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCollection")
            .field("len", &self.len())
            .field("materialized", &self.materialized())
            .finish()
    }
}

/// Iterator over a [`ResultCollection`] in record order.
pub struct Iter<'a, E: Entity> {
    collection: &'a ResultCollection<E>,
    index: usize,
}

impl<'a, E: Entity> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.collection.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.collection.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<E: Entity> ExactSizeIterator for Iter<'_, E> {}

impl<'a, E: Entity> IntoIterator for &'a ResultCollection<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ValidationErrors;
    use crate::record::RecordId;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Default)]
    struct Slug {
        id: Option<String>,
        title: String,
    }

    impl Entity for Slug {
        fn id(&self) -> Option<RecordId> {
            self.id.clone().map(RecordId::from)
        }

        fn to_record(&self) -> Record {
            let mut record = Record::new();
            if let Some(id) = &self.id {
                record.insert("id".into(), json!(id));
            }
            record.insert("title".into(), json!(self.title));
            record
        }

        fn from_record(&mut self, record: Record) {
            if let Some(Value::String(id)) = record.get("id") {
                self.id = Some(id.clone());
            }
            if let Some(Value::String(title)) = record.get("title") {
                self.title = title.clone();
            }
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn input_errors(&self) -> ValidationErrors {
            ValidationErrors::new()
        }
    }

    fn counting_factory() -> Slug {
        BUILT.fetch_add(1, Ordering::SeqCst);
        Slug::default()
    }

    fn records() -> Vec<Record> {
        ["some-slug", "some-other-slug", "some-final-slug"]
            .iter()
            .map(|id| {
                json!({ "id": id, "title": id.replace('-', " ") })
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_entities_are_materialized_once_on_access() {
        let collection = ResultCollection::new(records(), counting_factory);
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.materialized(), 0);

        let before = BUILT.load(Ordering::SeqCst);
        let first = collection.get(1).unwrap();
        assert_eq!(first.title, "some other slug");
        let again = collection.get(1).unwrap();
        assert!(std::ptr::eq(first, again));
        assert_eq!(BUILT.load(Ordering::SeqCst) - before, 1);
        assert_eq!(collection.materialized(), 1);
        assert!(collection.get(3).is_none());
    }

    #[test]
    fn test_iteration_follows_record_order() {
        let collection = ResultCollection::new(records(), Slug::default);
        let ids: Vec<_> = collection.iter().filter_map(|s| s.id.clone()).collect();
        assert_eq!(ids, ["some-slug", "some-other-slug", "some-final-slug"]);
        assert_eq!(collection.to_records(), records());
    }

    #[test]
    fn test_replace_records_resets_cache() {
        let mut collection = ResultCollection::new(records(), Slug::default);
        collection.iter().for_each(drop);
        assert_eq!(collection.materialized(), 3);

        collection.replace_records(records().into_iter().take(1).collect());
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.materialized(), 0);
    }

    #[test]
    fn test_from_entities_is_fully_materialized() {
        let slug = Slug {
            id: Some("ready".into()),
            title: "Ready".into(),
        };
        let collection = ResultCollection::from_entities(vec![slug], Slug::default);
        assert_eq!(collection.materialized(), 1);
        assert_eq!(collection.records()[0]["id"], json!("ready"));
    }
}
