//! # Client Events
//!
//! Typed event surface exposed to application code. Three events exist:
//! `add` and `clean` for log mutations observed locally or via
//! replication, and `role` for election transitions. Listeners may be
//! persistent or one-shot; both return an unsubscribe handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::election::Role;
use crate::store::{MutationKind, Record, RecordMeta};

/// Kind of client event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A mutation of kind `add` was observed
    Add,
    /// A mutation of kind `clean` was observed
    Clean,
    /// This context's role changed
    Role,
}

impl EventKind {
    /// The event kind carrying a given mutation kind
    pub fn for_mutation(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Add => EventKind::Add,
            MutationKind::Clean => EventKind::Clean,
        }
    }
}

/// One client event with its payload
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// An `add` mutation, local or replicated
    Add {
        /// Application payload
        payload: Value,
        /// Origin and scope tags
        meta: RecordMeta,
    },
    /// A `clean` mutation, local or replicated
    Clean {
        /// Application payload
        payload: Value,
        /// Origin and scope tags
        meta: RecordMeta,
    },
    /// The context's new role
    Role(Role),
}

impl ClientEvent {
    /// Build a mutation event from an applied record
    pub fn from_record(record: &Record) -> Self {
        Self::mutation(record.kind, record.payload.clone(), record.meta)
    }

    /// Build a mutation event from raw parts
    pub fn mutation(kind: MutationKind, payload: Value, meta: RecordMeta) -> Self {
        match kind {
            MutationKind::Add => ClientEvent::Add { payload, meta },
            MutationKind::Clean => ClientEvent::Clean { payload, meta },
        }
    }

    /// The kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Add { .. } => EventKind::Add,
            ClientEvent::Clean { .. } => EventKind::Clean,
            ClientEvent::Role(_) => EventKind::Role,
        }
    }
}

/// Callback invoked with each matching event
pub type EventListener = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

struct Entry {
    listener: EventListener,
    once: bool,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<HashMap<EventKind, HashMap<u64, Entry>>>,
    next_id: AtomicU64,
}

/// Listener registry for the client event surface
///
/// Cheaply cloneable handle; clones share one registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener
    pub fn on(&self, kind: EventKind, listener: EventListener) -> EventSubscription {
        self.subscribe(kind, listener, false)
    }

    /// Register a one-shot listener
    pub fn once(&self, kind: EventKind, listener: EventListener) -> EventSubscription {
        self.subscribe(kind, listener, true)
    }

    fn subscribe(&self, kind: EventKind, listener: EventListener, once: bool) -> EventSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.inner.listeners.write() {
            listeners
                .entry(kind)
                .or_default()
                .insert(id, Entry { listener, once });
        }
        EventSubscription {
            bus: self.clone(),
            kind,
            id,
        }
    }

    /// Deliver an event to every matching listener
    ///
    /// One-shot listeners are removed before invocation so a re-entrant
    /// emit cannot fire them twice.
    pub fn emit(&self, event: &ClientEvent) {
        let kind = event.kind();
        let callbacks: Vec<EventListener> = {
            let Ok(mut listeners) = self.inner.listeners.write() else {
                return;
            };
            let Some(for_kind) = listeners.get_mut(&kind) else {
                return;
            };

            let mut entries: Vec<(u64, EventListener)> = for_kind
                .iter()
                .map(|(id, entry)| (*id, Arc::clone(&entry.listener)))
                .collect();
            // Deliver in registration order
            entries.sort_by_key(|(id, _)| *id);

            for_kind.retain(|_, entry| !entry.once);
            entries.into_iter().map(|(_, listener)| listener).collect()
        };

        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of listeners registered for a kind
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .read()
            .ok()
            .and_then(|listeners| listeners.get(&kind).map(|m| m.len()))
            .unwrap_or(0)
    }

    fn remove(&self, kind: EventKind, id: u64) {
        if let Ok(mut listeners) = self.inner.listeners.write() {
            if let Some(for_kind) = listeners.get_mut(&kind) {
                for_kind.remove(&id);
            }
        }
    }
}

/// Handle to one registered listener
pub struct EventSubscription {
    bus: EventBus,
    kind: EventKind,
    id: u64,
}

impl EventSubscription {
    /// Remove the listener
    pub fn unsubscribe(self) {
        self.bus.remove(self.kind, self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::store::ContextId;

    fn add_event() -> ClientEvent {
        ClientEvent::Add {
            payload: json!({"n": 1}),
            meta: RecordMeta::local(ContextId::generate()),
        }
    }

    #[test]
    fn test_on_delivers_every_emit() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let _sub = bus.on(
            EventKind::Add,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.emit(&add_event());
        bus.emit(&add_event());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let _sub = bus.once(
            EventKind::Add,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.emit(&add_event());
        bus.emit(&add_event());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventKind::Add), 0);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let sub = bus.on(
            EventKind::Role,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.emit(&ClientEvent::Role(Role::Leader));
        sub.unsubscribe();
        bus.emit(&ClientEvent::Role(Role::Follower));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_only_reach_matching_kind() {
        let bus = EventBus::new();
        let adds = Arc::new(AtomicUsize::new(0));
        let cleans = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&adds);
        let _a = bus.on(
            EventKind::Add,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let counter = Arc::clone(&cleans);
        let _c = bus.on(
            EventKind::Clean,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.emit(&add_event());
        assert_eq!(adds.load(Ordering::SeqCst), 1);
        assert_eq!(cleans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_one_registry() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let _sub = clone.on(
            EventKind::Add,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.emit(&add_event());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(EventKind::for_mutation(MutationKind::Add), EventKind::Add);
        assert_eq!(
            EventKind::for_mutation(MutationKind::Clean),
            EventKind::Clean
        );
        assert_eq!(ClientEvent::Role(Role::Leader).kind(), EventKind::Role);
    }
}
