//! # In-Memory Store
//!
//! Default store adapter backing the log with process memory. Mutations
//! of either kind append a record; listeners are notified synchronously
//! after the record is committed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::{ListenerId, MutationKind, MutationListener, Record, RecordMeta, Store};

/// In-memory log store
pub struct MemoryStore {
    /// Next record sequence number
    next_sequence: AtomicU64,

    /// Applied records in sequence order
    records: RwLock<Vec<Record>>,

    /// Registered mutation listeners
    listeners: RwLock<HashMap<ListenerId, MutationListener>>,

    /// Next listener handle
    next_listener: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            next_sequence: AtomicU64::new(1),
            records: RwLock::new(Vec::new()),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Snapshot current listeners so notification runs without the lock
    fn listeners_snapshot(&self) -> Vec<MutationListener> {
        self.listeners
            .read()
            .map(|listeners| listeners.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Store for MemoryStore {
    fn append(&self, kind: MutationKind, payload: Value, meta: RecordMeta) -> StoreResult<Record> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let record = Record {
            sequence,
            kind,
            payload,
            meta,
            timestamp: Utc::now(),
        };

        {
            let mut records = self
                .records
                .write()
                .map_err(|_| StoreError::internal("records lock poisoned"))?;
            records.push(record.clone());
        }

        for listener in self.listeners_snapshot() {
            listener(&record);
        }

        Ok(record)
    }

    fn subscribe(&self, listener: MutationListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.insert(id, listener);
        }
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.remove(&id);
        }
    }

    fn records(&self) -> Vec<Record> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    fn purge(&self) -> StoreResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::internal("records lock poisoned"))?;
        records.clear();
        self.next_sequence.store(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::ContextId;

    fn meta() -> RecordMeta {
        RecordMeta::local(ContextId::generate())
    }

    #[test]
    fn test_append_assigns_monotonic_sequences() {
        let store = MemoryStore::new();

        let first = store
            .append(MutationKind::Add, json!({"n": 1}), meta())
            .unwrap();
        let second = store
            .append(MutationKind::Clean, json!({"n": 2}), meta())
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_listeners_observe_each_mutation_once() {
        let store = MemoryStore::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        store.subscribe(Arc::new(move |_record| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.append(MutationKind::Add, json!({}), meta()).unwrap();
        store.append(MutationKind::Add, json!({}), meta()).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = MemoryStore::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let id = store.subscribe(Arc::new(move |_record| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.append(MutationKind::Add, json!({}), meta()).unwrap();
        store.unsubscribe(id);
        store.append(MutationKind::Add, json!({}), meta()).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_purge_empties_store_and_resets_sequence() {
        let store = MemoryStore::new();
        store.append(MutationKind::Add, json!({}), meta()).unwrap();
        store.append(MutationKind::Add, json!({}), meta()).unwrap();

        store.purge().unwrap();
        assert!(store.is_empty());

        let fresh = store.append(MutationKind::Add, json!({}), meta()).unwrap();
        assert_eq!(fresh.sequence, 1);
    }

    #[test]
    fn test_records_preserve_local_order() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .append(MutationKind::Add, json!({"n": n}), meta())
                .unwrap();
        }

        let records = store.records();
        let sequences: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }
}
