//! # Log Store Capability
//!
//! The local, context-owned mutation log. The store is opaque to the
//! coordination core: it appends `add`/`clean` mutations, notifies
//! subscribers of every applied record, and may optionally support a
//! full purge. Cross-context visibility of store content happens only
//! through replicated mutation envelopes, never through shared access
//! to the store itself.

mod errors;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque identifier for one execution context
///
/// Generated once at client construction, stable for the context's
/// lifetime, never persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Generate a fresh context identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse from the string form used in broadcast payloads
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of log mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// A record was added to the log
    Add,
    /// A record was cleaned from the log
    Clean,
}

impl MutationKind {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Add => "add",
            MutationKind::Clean => "clean",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-record coordination tags
///
/// `origin` names the context that created the record and is the loop
/// guard for replication: records with a foreign origin are never
/// rebroadcast. `scope` optionally restricts a mutation to a single
/// context (e.g. UI-local actions); scoped records are suppressed from
/// broadcast when scoped to the writer and filtered on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Context that created this record
    pub origin: ContextId,

    /// Context this mutation is restricted to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ContextId>,
}

impl RecordMeta {
    /// Meta for an unrestricted local record
    pub fn local(origin: ContextId) -> Self {
        Self {
            origin,
            scope: None,
        }
    }

    /// Meta for a record restricted to one context
    pub fn scoped(origin: ContextId, scope: ContextId) -> Self {
        Self {
            origin,
            scope: Some(scope),
        }
    }

    /// Whether this record is restricted to the given context
    pub fn is_scoped_to(&self, context: ContextId) -> bool {
        self.scope == Some(context)
    }
}

/// One applied log mutation
#[derive(Debug, Clone)]
pub struct Record {
    /// Per-store monotonically increasing sequence number
    pub sequence: u64,

    /// Mutation kind
    pub kind: MutationKind,

    /// Application payload
    pub payload: Value,

    /// Coordination tags
    pub meta: RecordMeta,

    /// Time the mutation was applied locally
    pub timestamp: DateTime<Utc>,
}

/// Callback invoked for every applied mutation
pub type MutationListener = Arc<dyn Fn(&Record) + Send + Sync>;

/// Handle identifying a registered listener
pub type ListenerId = u64;

/// The log store capability
///
/// Owned exclusively by its local context. Listeners observe local
/// mutations immediately and strictly in local order.
pub trait Store: Send + Sync {
    /// Apply a mutation and return the applied record
    fn append(&self, kind: MutationKind, payload: Value, meta: RecordMeta) -> StoreResult<Record>;

    /// Register a mutation listener
    fn subscribe(&self, listener: MutationListener) -> ListenerId;

    /// Remove a previously registered listener
    fn unsubscribe(&self, id: ListenerId);

    /// All records currently held, in sequence order
    fn records(&self) -> Vec<Record>;

    /// Number of records currently held
    fn len(&self) -> usize;

    /// Whether the store holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every stored record
    ///
    /// Stores without purge support report `PurgeUnsupported`; callers
    /// fall back to dropping their store reference.
    fn purge(&self) -> StoreResult<()> {
        Err(StoreError::PurgeUnsupported)
    }
}
