//! # Generic Resource
//!
//! This module defines [`Resource`], the CRUD façade over a [`DataSource`]. It turns raw records
//! into entities, validates writes and gives listeners a chance to act before and after every
//! operation.
//!
//! ## Operations
//!
//! * **get_all**: `get-all.pre` may answer with a ready collection. Otherwise the data source is
//!   queried with an empty [`Query`], `get-all.post-query` sees the raw records and `get-all.post`
//!   sees the [`ResultCollection`].
//! * **get**: `get.pre` may answer with a ready entity. A missing record is `None`.
//! * **create**: the spec is normalized to an entity, `create.pre` may adjust it, then validation
//!   runs. Invalid entities come back as [`WriteOutcome::ValidationFailed`] and nothing is written.
//! * **update**: the target must exist ([`ResourceError::NotFound`] otherwise). `update.pre` may
//!   rewrite the in-flight fields before they are merged into the entity and validated.
//! * **delete**: resolves the entity (by id or directly) and returns `false` when there is none.
//!   A `delete.pre` listener returning [`HookResult::Veto`] decides the result instead.
//!
//! Operations run their steps strictly in sequence. No lock is held while listeners run.

use crate::collection::ResultCollection;
use crate::data_source::DataSource;
use crate::entity::{Entity, EntityFactory, WriteOutcome};
use crate::error::ResourceError;
use crate::events::{EventEmitter, EventManager, HookResult, ResourceEvent, Responses};
use crate::query::Query;
use crate::record::{Record, RecordId};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Input of [`Resource::create`] and [`Resource::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Spec<E> {
    /// A constructed entity.
    Entity(E),
    /// Raw fields. Anything but a JSON object is rejected.
    Fields(Value),
}

impl<E> From<Value> for Spec<E> {
    fn from(value: Value) -> Self {
        Self::Fields(value)
    }
}

impl<E> From<Record> for Spec<E> {
    fn from(record: Record) -> Self {
        Self::Fields(Value::Object(record))
    }
}

/// Input of [`Resource::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Target<E> {
    Id(RecordId),
    Entity(E),
}

impl<E> From<RecordId> for Target<E> {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl<E> From<&str> for Target<E> {
    fn from(id: &str) -> Self {
        Self::Id(id.into())
    }
}

impl<E> From<i64> for Target<E> {
    fn from(id: i64) -> Self {
        Self::Id(id.into())
    }
}

/// CRUD orchestration for one entity type over one data source.
pub struct Resource<E: Entity, D: DataSource, V: EventEmitter<E> = EventManager<E>> {
    data_source: D,
    events: V,
    factory: EntityFactory<E>,
}

impl<E: Entity + Default, D: DataSource> Resource<E, D> {
    /// Creates a resource that builds entities with [`Default::default`].
    pub fn new(data_source: D) -> Self {
        Self::with_factory(data_source, E::default)
    }
}

impl<E: Entity, D: DataSource> Resource<E, D> {
    /// Creates a resource that builds entities with `factory`.
    pub fn with_factory(data_source: D, factory: EntityFactory<E>) -> Self {
        Self {
            data_source,
            events: EventManager::new(),
            factory,
        }
    }
}

impl<E: Entity, D: DataSource, V: EventEmitter<E>> Resource<E, D, V> {
    /// Swaps the event emitter. Listeners attached to the previous one are dropped with it.
    pub fn with_events<W: EventEmitter<E>>(self, events: W) -> Resource<E, D, W> {
        Resource {
            data_source: self.data_source,
            events,
            factory: self.factory,
        }
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    pub fn events(&self) -> &V {
        &self.events
    }

    /// Builds the blank entities that records are loaded into.
    pub fn factory(&self) -> EntityFactory<E> {
        self.factory
    }

    /// The entity type name (e.g. `BlogEntry`).
    pub fn resource_id(&self) -> &'static str {
        std::any::type_name::<E>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
    }

    /// Fetches every record and wraps it in a lazy collection.
    pub async fn get_all(&self) -> Result<ResultCollection<E>, ResourceError> {
        let entity_type = self.resource_id();
        debug!(entity_type, "Get all");

        let responses = self
            .events
            .emit_until(&mut ResourceEvent::GetAllPre, &HookResult::<E>::is_collection);
        if let Some(HookResult::Collection(items)) = short_circuit(responses) {
            debug!(entity_type, size = items.len(), "Get all answered by listener");
            return Ok(items);
        }

        let records = self.data_source.query(&Query::new()).await?;
        self.events
            .emit(&mut ResourceEvent::GetAllPostQuery { records: &records });

        let items = ResultCollection::new(records, self.factory);
        self.events.emit(&mut ResourceEvent::GetAllPost { items: &items });
        debug!(entity_type, size = items.len(), "Got all");
        Ok(items)
    }

    /// Fetches one entity. A missing record is `None`.
    pub async fn get(&self, id: impl Into<RecordId>) -> Result<Option<E>, ResourceError> {
        let entity_type = self.resource_id();
        let id = id.into();

        let responses = self
            .events
            .emit_until(&mut ResourceEvent::GetPre { id: &id }, &HookResult::<E>::is_entity);
        if let Some(HookResult::Entity(entity)) = short_circuit(responses) {
            debug!(entity_type, %id, "Get answered by listener");
            return Ok(Some(entity));
        }

        let record = self.data_source.get(&id).await?;
        debug!(entity_type, %id, found = record.is_some(), "Get");
        let Some(record) = record else {
            return Ok(None);
        };

        let entity = self.materialize(record);
        self.events.emit(&mut ResourceEvent::GetPost { entity: &entity });
        Ok(Some(entity))
    }

    /// Validates and persists a new entity.
    pub async fn create(
        &self,
        spec: impl Into<Spec<E>>,
    ) -> Result<WriteOutcome<E>, ResourceError> {
        let entity_type = self.resource_id();
        let mut entity = match spec.into() {
            Spec::Entity(entity) => entity,
            Spec::Fields(fields) => self.materialize(self.expect_object(fields)?),
        };
        debug!(entity_type, id = ?entity.id(), "Create");

        self.events
            .emit(&mut ResourceEvent::CreatePre { entity: &mut entity });

        if !entity.is_valid() {
            let errors = entity.input_errors();
            warn!(entity_type, ?errors, "Create rejected by validation");
            return Ok(WriteOutcome::ValidationFailed(errors));
        }

        let stored = self.data_source.create(entity.to_record()).await?;
        entity.from_record(stored);
        info!(entity_type, id = ?entity.id(), "Created");

        self.events.emit(&mut ResourceEvent::CreatePost { entity: &entity });
        Ok(WriteOutcome::Saved(entity))
    }

    /// Merges `spec` into an existing entity, validates and persists it.
    pub async fn update(
        &self,
        id: impl Into<RecordId>,
        spec: impl Into<Spec<E>>,
    ) -> Result<WriteOutcome<E>, ResourceError> {
        let entity_type = self.resource_id();
        let id = id.into();

        let Some(mut entity) = self.get(id.clone()).await? else {
            warn!(entity_type, %id, "Not found");
            return Err(ResourceError::NotFound(format!(
                "{entity_type} with id \"{id}\" does not exist"
            )));
        };

        let mut fields = match spec.into() {
            Spec::Entity(update) => update.to_record(),
            Spec::Fields(fields) => self.expect_object(fields)?,
        };
        debug!(entity_type, %id, ?fields, "Update");

        self.events.emit(&mut ResourceEvent::UpdatePre {
            id: &id,
            fields: &mut fields,
        });

        entity.from_record(fields.clone());
        if !entity.is_valid() {
            let errors = entity.input_errors();
            warn!(entity_type, %id, ?errors, "Update rejected by validation");
            return Ok(WriteOutcome::ValidationFailed(errors));
        }

        let stored = self.data_source.update(&id, fields).await?;
        entity.from_record(stored);
        info!(entity_type, %id, "Updated");

        self.events.emit(&mut ResourceEvent::UpdatePost { entity: &entity });
        Ok(WriteOutcome::Saved(entity))
    }

    /// Removes an entity. Returns `false` when there is nothing to remove.
    pub async fn delete(&self, target: impl Into<Target<E>>) -> Result<bool, ResourceError> {
        let entity_type = self.resource_id();
        let (id, entity) = match target.into() {
            Target::Entity(entity) => match entity.id() {
                Some(id) => (id, entity),
                None => {
                    warn!(entity_type, "Cannot delete an entity without identity");
                    return Ok(false);
                }
            },
            Target::Id(id) => match self.get(id.clone()).await? {
                Some(entity) => (id, entity),
                None => {
                    warn!(entity_type, %id, "Not found");
                    return Ok(false);
                }
            },
        };
        debug!(entity_type, %id, "Delete");

        let responses = self
            .events
            .emit_until(&mut ResourceEvent::DeletePre { entity: &entity }, &HookResult::<E>::is_veto);
        if let Some(HookResult::Veto(decision)) = short_circuit(responses) {
            debug!(entity_type, %id, decision, "Delete decided by listener");
            return Ok(decision);
        }

        self.data_source.delete(&id).await?;
        info!(entity_type, %id, "Deleted");

        self.events.emit(&mut ResourceEvent::DeletePost {
            id: &id,
            entity: &entity,
        });
        Ok(true)
    }

    fn materialize(&self, record: Record) -> E {
        let mut entity = (self.factory)();
        entity.from_record(record);
        entity
    }

    fn expect_object(&self, fields: Value) -> Result<Record, ResourceError> {
        match fields {
            Value::Object(record) => Ok(record),
            other => Err(ResourceError::InvalidInput(format!(
                "Expected an object or {} entity; received {}",
                self.resource_id(),
                kind_of(&other)
            ))),
        }
    }
}

fn short_circuit<E: Entity>(responses: Responses<E>) -> Option<HookResult<E>> {
    if responses.stopped() {
        responses.into_last()
    } else {
        None
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ValidationErrors;
    use crate::mock::MockDataSource;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Note {
        id: Option<RecordId>,
        text: String,
    }

    impl Entity for Note {
        fn id(&self) -> Option<RecordId> {
            self.id.clone()
        }

        fn to_record(&self) -> Record {
            let mut record = Record::new();
            if let Some(id) = &self.id {
                record.insert("id".into(), id.to_value());
            }
            record.insert("text".into(), json!(self.text));
            record
        }

        fn from_record(&mut self, record: Record) {
            if let Some(id) = RecordId::of(&record) {
                self.id = Some(id);
            }
            if let Some(Value::String(text)) = record.get("text") {
                self.text = text.clone();
            }
        }

        fn is_valid(&self) -> bool {
            !self.text.is_empty()
        }

        fn input_errors(&self) -> ValidationErrors {
            let mut errors = ValidationErrors::new();
            if self.text.is_empty() {
                errors.add("text", "Value is required and can't be empty");
            }
            errors
        }
    }

    #[test]
    fn test_resource_id_is_entity_type_name() {
        let resource = Resource::<Note, _>::new(MockDataSource::new());
        assert_eq!(resource.resource_id(), "Note");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_fields() {
        let resource = Resource::<Note, _>::new(MockDataSource::new());
        let err = resource.create(json!("just text")).await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidInput(ref m) if m.contains("string")));
        assert_eq!(resource.data_source().stored(), 0);
    }

    #[tokio::test]
    async fn test_create_assigns_identity_from_store() {
        let resource = Resource::<Note, _>::new(MockDataSource::new());
        let note = resource
            .create(json!({ "text": "hello" }))
            .await
            .unwrap()
            .saved()
            .unwrap();
        assert_eq!(note.id, Some(RecordId::Int(1)));
    }

    #[tokio::test]
    async fn test_delete_entity_without_identity_is_false() {
        let resource = Resource::<Note, _>::new(MockDataSource::new());
        let removed = resource
            .delete(Target::Entity(Note::default()))
            .await
            .unwrap();
        assert!(!removed);
    }
}
