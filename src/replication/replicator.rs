//! # Log Replicator
//!
//! Bridges the local store and the broadcast medium. No cross-context
//! total order is provided: each context observes its own mutations
//! immediately and in local order, remote mutations in whatever order
//! the medium delivered them.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::broadcast::{BroadcastMedium, KeySet, MutationEnvelope};
use crate::client::{ClientEvent, EventBus};
use crate::observability::{log_event, Event, Severity};
use crate::store::{ContextId, ListenerId, MutationKind, Record, Store};

struct ReplicatorInner {
    context_id: ContextId,
    keys: KeySet,
    medium: Option<Arc<dyn BroadcastMedium>>,
    store: Arc<dyn Store>,
    bus: EventBus,
    store_listener: Mutex<Option<ListenerId>>,
}

/// Mutation replication for one context
#[derive(Clone)]
pub struct LogReplicator {
    inner: Arc<ReplicatorInner>,
}

impl LogReplicator {
    /// Create a replicator; does not subscribe yet
    pub fn new(
        context_id: ContextId,
        keys: KeySet,
        medium: Option<Arc<dyn BroadcastMedium>>,
        store: Arc<dyn Store>,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ReplicatorInner {
                context_id,
                keys,
                medium,
                store,
                bus,
                store_listener: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to the local store's mutation stream
    pub fn install(&self) {
        let inner = Arc::clone(&self.inner);
        let id = self
            .inner
            .store
            .subscribe(Arc::new(move |record| inner.on_local_mutation(record)));
        if let Ok(mut slot) = self.inner.store_listener.lock() {
            *slot = Some(id);
        }
    }

    /// Release the store subscription; idempotent
    pub fn release(&self) {
        let id = self
            .inner
            .store_listener
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(id) = id {
            self.inner.store.unsubscribe(id);
        }
    }

    /// A mutation envelope arrived from the medium
    pub fn on_envelope(&self, kind: MutationKind, value: &Value) {
        self.inner.on_envelope(kind, value);
    }
}

impl ReplicatorInner {
    /// Every mutation applied to the local store lands here, whether it
    /// was written by the application or replayed from a remote
    /// envelope. The application always hears about it; only genuinely
    /// local writes go back out to the medium.
    fn on_local_mutation(&self, record: &Record) {
        self.bus.emit(&ClientEvent::from_record(record));

        // Foreign origin means this record arrived via replication;
        // rebroadcasting it would loop. Records scoped to this context
        // stay local by definition.
        if record.meta.origin != self.context_id || record.meta.is_scoped_to(self.context_id) {
            return;
        }

        if let Some(medium) = &self.medium {
            let envelope =
                MutationEnvelope::new(record.kind, record.payload.clone(), record.meta);
            medium.publish(&self.keys.for_mutation(record.kind), envelope.to_value());
            log_event(
                Severity::Trace,
                Event::MutationBroadcast,
                &[
                    ("context", &self.context_id.to_string()),
                    ("kind", record.kind.as_str()),
                ],
            );
        }
    }

    fn on_envelope(&self, kind: MutationKind, value: &Value) {
        let envelope = match MutationEnvelope::from_value(kind, value) {
            Ok(envelope) => envelope,
            Err(err) => {
                log_event(
                    Severity::Warn,
                    Event::PayloadDiscarded,
                    &[
                        ("context", &self.context_id.to_string()),
                        ("key", &self.keys.for_mutation(kind)),
                        ("reason", &err.to_string()),
                    ],
                );
                return;
            }
        };

        // The medium never delivers to the writer, but a misbehaving
        // one must not make a context double-apply its own mutation.
        if envelope.meta.origin == self.context_id {
            return;
        }

        match envelope.meta.scope {
            // Addressed to some other context: not ours to observe
            Some(scope) if scope != self.context_id => {}

            // Addressed to this context: an ephemeral tagged action,
            // observed but never written into the authoritative log
            Some(_) => {
                self.bus
                    .emit(&ClientEvent::mutation(kind, envelope.payload, envelope.meta));
            }

            // An actual store-level write: apply through the same path
            // local writes take; the store's own mutation event then
            // produces the single application notification
            None => match self.store.append(kind, envelope.payload, envelope.meta) {
                Ok(_record) => {
                    log_event(
                        Severity::Trace,
                        Event::MutationApplied,
                        &[
                            ("context", &self.context_id.to_string()),
                            ("kind", kind.as_str()),
                            ("origin", &envelope.meta.origin.to_string()),
                        ],
                    );
                }
                Err(err) => {
                    log_event(
                        Severity::Error,
                        Event::PayloadDiscarded,
                        &[
                            ("context", &self.context_id.to_string()),
                            ("kind", kind.as_str()),
                            ("reason", &err.to_string()),
                        ],
                    );
                }
            },
        }
    }
}
