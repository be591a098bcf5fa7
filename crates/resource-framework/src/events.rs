//! # Resource Hooks
//!
//! Every [`Resource`](crate::Resource) operation emits events before and after it touches the
//! data source. Listeners are attached per [`HookPoint`] on an [`EventManager`] and receive a
//! typed [`ResourceEvent`].
//!
//! ## Short-circuiting
//!
//! Some pre-hooks are emitted with [`EventEmitter::emit_until`]: listeners run in order until one
//! returns a result the orchestrator can use in place of the rest of the operation.
//!
//! | Hook point  | Result that short-circuits                  |
//! |-------------|---------------------------------------------|
//! | `get-all.pre` | [`HookResult::Collection`]                |
//! | `get.pre`     | [`HookResult::Entity`]                    |
//! | `delete.pre`  | [`HookResult::Veto`] (returned as-is)     |
//!
//! ```rust
//! use resource_framework::{EventManager, HookPoint, HookResult, ResourceEvent};
//! # use resource_framework::{Entity, Record, RecordId, ValidationErrors};
//! # #[derive(Default)] struct Note;
//! # impl Entity for Note {
//! #     fn id(&self) -> Option<RecordId> { None }
//! #     fn to_record(&self) -> Record { Record::new() }
//! #     fn from_record(&mut self, _: Record) {}
//! #     fn is_valid(&self) -> bool { true }
//! #     fn input_errors(&self) -> ValidationErrors { ValidationErrors::new() }
//! # }
//!
//! let events = EventManager::<Note>::new();
//! events.attach(HookPoint::DeletePre, 0, |_event: &mut ResourceEvent<'_, Note>| {
//!     HookResult::Veto(false)
//! });
//! ```
//!
//! ## Re-entrancy
//!
//! Listeners may run arbitrary code, including attaching or detaching listeners on the same
//! manager. The listener table is snapshotted and its lock released before any listener runs.

use crate::collection::ResultCollection;
use crate::entity::Entity;
use crate::record::{Record, RecordId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Named extension points of the resource lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    GetAllPre,
    GetAllPostQuery,
    GetAllPost,
    GetPre,
    GetPost,
    CreatePre,
    CreatePost,
    UpdatePre,
    UpdatePost,
    DeletePre,
    DeletePost,
}

impl HookPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAllPre => "get-all.pre",
            Self::GetAllPostQuery => "get-all.post-query",
            Self::GetAllPost => "get-all.post",
            Self::GetPre => "get.pre",
            Self::GetPost => "get.post",
            Self::CreatePre => "create.pre",
            Self::CreatePost => "create.post",
            Self::UpdatePre => "update.pre",
            Self::UpdatePost => "update.post",
            Self::DeletePre => "delete.pre",
            Self::DeletePost => "delete.post",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to listeners.
pub enum ResourceEvent<'a, E: Entity> {
    GetAllPre,
    GetAllPostQuery { records: &'a [Record] },
    GetAllPost { items: &'a ResultCollection<E> },
    GetPre { id: &'a RecordId },
    GetPost { entity: &'a E },
    /// The entity about to be validated and persisted; listeners may adjust it.
    CreatePre { entity: &'a mut E },
    CreatePost { entity: &'a E },
    /// The in-flight update fields; listeners may rewrite them.
    UpdatePre { id: &'a RecordId, fields: &'a mut Record },
    UpdatePost { entity: &'a E },
    DeletePre { entity: &'a E },
    DeletePost { id: &'a RecordId, entity: &'a E },
}

impl<E: Entity> ResourceEvent<'_, E> {
    pub fn hook(&self) -> HookPoint {
        match self {
            Self::GetAllPre => HookPoint::GetAllPre,
            Self::GetAllPostQuery { .. } => HookPoint::GetAllPostQuery,
            Self::GetAllPost { .. } => HookPoint::GetAllPost,
            Self::GetPre { .. } => HookPoint::GetPre,
            Self::GetPost { .. } => HookPoint::GetPost,
            Self::CreatePre { .. } => HookPoint::CreatePre,
            Self::CreatePost { .. } => HookPoint::CreatePost,
            Self::UpdatePre { .. } => HookPoint::UpdatePre,
            Self::UpdatePost { .. } => HookPoint::UpdatePost,
            Self::DeletePre { .. } => HookPoint::DeletePre,
            Self::DeletePost { .. } => HookPoint::DeletePost,
        }
    }
}

/// What a listener hands back.
pub enum HookResult<E: Entity> {
    Continue,
    Collection(ResultCollection<E>),
    Entity(E),
    Veto(bool),
}

impl<E: Entity> HookResult<E> {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Veto(_))
    }
}

impl<E: Entity> fmt::Debug for HookResult<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Collection(items) => f.debug_tuple("Collection").field(items).finish(),
            Self::Entity(_) => f.write_str("Entity(..)"),
            Self::Veto(value) => f.debug_tuple("Veto").field(value).finish(),
        }
    }
}

/// Outcome of [`EventEmitter::emit_until`].
pub struct Responses<E: Entity> {
    stopped: bool,
    last: Option<HookResult<E>>,
}

impl<E: Entity> Responses<E> {
    pub fn new(stopped: bool, last: Option<HookResult<E>>) -> Self {
        Self { stopped, last }
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Result of the last listener that ran (the stopping one, when stopped).
    pub fn last(&self) -> Option<&HookResult<E>> {
        self.last.as_ref()
    }

    pub fn into_last(self) -> Option<HookResult<E>> {
        self.last
    }
}

/// A hook listener.
pub type Listener<E> = dyn Fn(&mut ResourceEvent<'_, E>) -> HookResult<E> + Send + Sync;

/// Handle returned by [`EventManager::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The event capability the orchestrator depends on.
pub trait EventEmitter<E: Entity>: Send + Sync {
    /// Runs every listener for the event's hook point.
    fn emit(&self, event: &mut ResourceEvent<'_, E>);

    /// Runs listeners in order until `stop` accepts a result.
    fn emit_until(
        &self,
        event: &mut ResourceEvent<'_, E>,
        stop: &dyn Fn(&HookResult<E>) -> bool,
    ) -> Responses<E>;
}

struct Registration<E: Entity> {
    id: ListenerId,
    priority: i32,
    listener: Arc<Listener<E>>,
}

/// Synchronous, ordered listener registry.
pub struct EventManager<E: Entity> {
    listeners: RwLock<HashMap<HookPoint, Vec<Registration<E>>>>,
    next_id: AtomicU64,
}

impl<E: Entity> EventManager<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Attaches a listener. Higher priorities run first; equal priorities run in attachment order.
    pub fn attach<F>(&self, hook: HookPoint, priority: i32, listener: F) -> ListenerId
    where
        F: Fn(&mut ResourceEvent<'_, E>) -> HookResult<E> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write();
        let registrations = listeners.entry(hook).or_default();
        let position = registrations
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(registrations.len());
        registrations.insert(
            position,
            Registration {
                id,
                priority,
                listener: Arc::new(listener),
            },
        );
        id
    }

    /// Removes a listener. Returns whether it was attached.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        for registrations in listeners.values_mut() {
            if let Some(position) = registrations.iter().position(|r| r.id == id) {
                registrations.remove(position);
                return true;
            }
        }
        false
    }

    /// Removes every listener of `hook`.
    pub fn clear(&self, hook: HookPoint) {
        self.listeners.write().remove(&hook);
    }

    pub fn listener_count(&self, hook: HookPoint) -> usize {
        self.listeners.read().get(&hook).map_or(0, Vec::len)
    }

    fn snapshot(&self, hook: HookPoint) -> Vec<Arc<Listener<E>>> {
        self.listeners
            .read()
            .get(&hook)
            .map(|registrations| registrations.iter().map(|r| Arc::clone(&r.listener)).collect())
            .unwrap_or_default()
    }
}

impl<E: Entity> Default for EventManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EventEmitter<E> for EventManager<E> {
    fn emit(&self, event: &mut ResourceEvent<'_, E>) {
        for listener in self.snapshot(event.hook()) {
            listener(&mut *event);
        }
    }

    fn emit_until(
        &self,
        event: &mut ResourceEvent<'_, E>,
        stop: &dyn Fn(&HookResult<E>) -> bool,
    ) -> Responses<E> {
        let mut last = None;
        for listener in self.snapshot(event.hook()) {
            let result = listener(&mut *event);
            if stop(&result) {
                return Responses {
                    stopped: true,
                    last: Some(result),
                };
            }
            last = Some(result);
        }
        Responses {
            stopped: false,
            last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ValidationErrors;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Note;

    impl Entity for Note {
        fn id(&self) -> Option<RecordId> {
            None
        }
        fn to_record(&self) -> Record {
            Record::new()
        }
        fn from_record(&mut self, _record: Record) {}
        fn is_valid(&self) -> bool {
            true
        }
        fn input_errors(&self) -> ValidationErrors {
            ValidationErrors::new()
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl Fn(&mut ResourceEvent<'_, Note>) -> HookResult<Note> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_event: &mut ResourceEvent<'_, Note>| {
            log.lock().push(name);
            HookResult::Continue
        }
    }

    #[test]
    fn test_listeners_run_by_priority_then_attachment_order() {
        let events = EventManager::<Note>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.attach(HookPoint::GetAllPre, 0, recorder(&log, "first"));
        events.attach(HookPoint::GetAllPre, 10, recorder(&log, "urgent"));
        events.attach(HookPoint::GetAllPre, 0, recorder(&log, "second"));
        events.attach(HookPoint::GetPre, 100, recorder(&log, "other hook"));

        events.emit(&mut ResourceEvent::GetAllPre);
        assert_eq!(*log.lock(), ["urgent", "first", "second"]);
    }

    #[test]
    fn test_emit_until_stops_on_accepted_result() {
        let events = EventManager::<Note>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        events.attach(HookPoint::DeletePre, 0, recorder(&log, "before"));
        events.attach(HookPoint::DeletePre, 0, |_event: &mut ResourceEvent<'_, Note>| {
            HookResult::Veto(false)
        });
        events.attach(HookPoint::DeletePre, 0, recorder(&log, "after"));

        let note = Note;
        let responses = events.emit_until(
            &mut ResourceEvent::DeletePre { entity: &note },
            &|r: &HookResult<Note>| r.is_veto(),
        );
        assert!(responses.stopped());
        assert!(matches!(responses.last(), Some(HookResult::Veto(false))));
        assert_eq!(*log.lock(), ["before"]);
    }

    #[test]
    fn test_emit_until_without_match_reports_last_result() {
        let events = EventManager::<Note>::new();
        events.attach(HookPoint::GetAllPre, 0, |_event: &mut ResourceEvent<'_, Note>| {
            HookResult::Veto(true)
        });
        let responses = events.emit_until(&mut ResourceEvent::GetAllPre, &|r: &HookResult<Note>| {
            r.is_collection()
        });
        assert!(!responses.stopped());
        assert!(matches!(responses.into_last(), Some(HookResult::Veto(true))));
    }

    #[test]
    fn test_detach_and_clear() {
        let events = EventManager::<Note>::new();
        let id = events.attach(HookPoint::GetPost, 0, |_event: &mut ResourceEvent<'_, Note>| {
            HookResult::Continue
        });
        events.attach(HookPoint::GetPost, 0, |_event: &mut ResourceEvent<'_, Note>| {
            HookResult::Continue
        });
        assert_eq!(events.listener_count(HookPoint::GetPost), 2);
        assert!(events.detach(id));
        assert!(!events.detach(id));
        assert_eq!(events.listener_count(HookPoint::GetPost), 1);
        events.clear(HookPoint::GetPost);
        assert_eq!(events.listener_count(HookPoint::GetPost), 0);
    }

    #[test]
    fn test_listener_may_attach_while_running() {
        let events = Arc::new(EventManager::<Note>::new());
        let inner = Arc::clone(&events);
        events.attach(HookPoint::GetAllPre, 0, move |_event: &mut ResourceEvent<'_, Note>| {
            inner.attach(HookPoint::GetAllPost, 0, |_event: &mut ResourceEvent<'_, Note>| {
                HookResult::Continue
            });
            HookResult::Continue
        });

        events.emit(&mut ResourceEvent::GetAllPre);
        assert_eq!(events.listener_count(HookPoint::GetAllPost), 1);
    }
}
