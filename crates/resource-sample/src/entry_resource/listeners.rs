//! Listeners the blog attaches to the entry resource.
//!
//! | Hook point   | Priority | Effect                                              |
//! |--------------|----------|-----------------------------------------------------|
//! | `create.pre` | 100      | stamps `created`/`updated` when unset               |
//! | `update.pre` | 100      | stamps `updated`, drops attempts to rewrite `created` |
//! | `delete.pre` | 0        | vetoes deleting published entries                   |
//!
//! Stamping runs at a high priority so it happens before any application listener looks at
//! the entity.

use crate::model::BlogEntry;
use resource_framework::{EventManager, HookPoint, HookResult, ListenerId, ResourceEvent};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

/// Source of Unix timestamps.
pub type Clock = fn() -> i64;

pub fn system_clock() -> i64 {
    Utc::now().timestamp()
}

/// Attaches every blog listener and returns their handles.
pub fn attach(events: &EventManager<BlogEntry>, clock: Clock) -> Vec<ListenerId> {
    vec![
        events.attach(HookPoint::CreatePre, 100, move |event| {
            if let ResourceEvent::CreatePre { entity } = event {
                stamp_new(entity, clock());
            }
            HookResult::Continue
        }),
        events.attach(HookPoint::UpdatePre, 100, move |event| {
            if let ResourceEvent::UpdatePre { id, fields } = event {
                if fields.remove("created").is_some() {
                    debug!(%id, "Ignoring attempt to rewrite created");
                }
                fields.insert("updated".to_string(), json!(clock()));
            }
            HookResult::Continue
        }),
        events.attach(HookPoint::DeletePre, 0, guard_published),
    ]
}

fn stamp_new(entry: &mut BlogEntry, now: i64) {
    if entry.created <= 0 {
        entry.created = now;
    }
    if entry.updated < entry.created {
        entry.updated = entry.created;
    }
}

fn guard_published(event: &mut ResourceEvent<'_, BlogEntry>) -> HookResult<BlogEntry> {
    match event {
        ResourceEvent::DeletePre { entity } if entity.is_published() => {
            warn!(id = %entity.id, "Refusing to delete a published entry");
            HookResult::Veto(false)
        }
        _ => HookResult::Continue,
    }
}
