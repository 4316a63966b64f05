//! # Broadcast Medium
//!
//! The origin-scoped key/value medium coordination runs on. Writes are
//! best-effort and last-write-wins per key; change notifications are
//! delivered to every handle except the writer. There is no ordering
//! guarantee across distinct keys.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// Callback invoked with `(key, value)` on every foreign write
pub type MessageHandler = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handle identifying a registered subscriber
pub type SubscriberId = u64;

/// The broadcast medium capability
///
/// `publish` is fire-and-forget: an unavailable medium is a silent
/// no-op, never an error. A handle never receives notifications for its
/// own writes.
pub trait BroadcastMedium: Send + Sync {
    /// Write a value under a key, notifying every other handle
    fn publish(&self, key: &str, value: Value);

    /// Read the last value written under a key
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a key
    fn remove(&self, key: &str);

    /// Register a change handler for this handle
    fn subscribe(&self, handler: MessageHandler) -> SubscriberId;

    /// Remove a previously registered handler
    fn unsubscribe(&self, id: SubscriberId);
}

struct Subscriber {
    /// Handle the subscriber was registered through
    owner: u64,
    handler: MessageHandler,
}

struct MediumShared {
    values: RwLock<HashMap<String, Value>>,
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    next_subscriber: AtomicU64,
    next_handle: AtomicU64,
}

/// In-process broadcast medium
///
/// Backs the medium contract with shared memory for contexts that are
/// threads or tasks of one process. Each context attaches its own
/// [`MediumHandle`]; delivery excludes the writing handle, matching the
/// contract of origin-scoped storage events.
#[derive(Clone)]
pub struct MemoryMedium {
    shared: Arc<MediumShared>,
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMedium {
    /// Create an empty medium
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MediumShared {
                values: RwLock::new(HashMap::new()),
                subscribers: RwLock::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// Attach a new context handle
    pub fn attach(&self) -> MediumHandle {
        MediumHandle {
            shared: Arc::clone(&self.shared),
            handle_id: self.shared.next_handle.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Read the last value written under a key (inspection helper)
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared
            .values
            .read()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }
}

/// One context's view of a [`MemoryMedium`]
pub struct MediumHandle {
    shared: Arc<MediumShared>,
    handle_id: u64,
}

impl MediumHandle {
    /// Snapshot foreign handlers so delivery runs without the lock held
    fn foreign_handlers(&self) -> Vec<MessageHandler> {
        self.shared
            .subscribers
            .read()
            .map(|subscribers| {
                subscribers
                    .values()
                    .filter(|s| s.owner != self.handle_id)
                    .map(|s| Arc::clone(&s.handler))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl BroadcastMedium for MediumHandle {
    fn publish(&self, key: &str, value: Value) {
        {
            let Ok(mut values) = self.shared.values.write() else {
                return;
            };
            values.insert(key.to_string(), value.clone());
        }

        for handler in self.foreign_handlers() {
            handler(key, &value);
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.shared
            .values
            .read()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.shared.values.write() {
            values.remove(key);
        }
    }

    fn subscribe(&self, handler: MessageHandler) -> SubscriberId {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut subscribers) = self.shared.subscribers.write() {
            subscribers.insert(
                id,
                Subscriber {
                    owner: self.handle_id,
                    handler,
                },
            );
        }
        id
    }

    fn unsubscribe(&self, id: SubscriberId) {
        if let Ok(mut subscribers) = self.shared.subscribers.write() {
            subscribers.remove(&id);
        }
    }
}
