//! crosslog - shared-log coordination across execution contexts
//!
//! Several independent execution contexts of one application share a
//! single logical server connection and a single logical event log.
//! Contexts agree, over an eventually-consistent key/value broadcast
//! medium, on exactly one leader holding the connection; everyone else
//! follows and stays consistent through mutation replication.

pub mod broadcast;
pub mod client;
pub mod election;
pub mod observability;
pub mod replication;
pub mod store;
pub mod sync;

pub use broadcast::{BroadcastMedium, MemoryMedium};
pub use client::{
    ClientConfig, ClientError, ClientEvent, ClientResult, CoordinatedClient, EventKind,
    EventSubscription,
};
pub use election::{Clock, ElectionTiming, Role};
pub use replication::LogReplicator;
pub use store::{ContextId, MemoryStore, MutationKind, Record, RecordMeta, Store};
pub use sync::{NullSyncEngine, SyncEngine, SyncState};
