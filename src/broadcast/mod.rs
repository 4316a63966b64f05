//! # Broadcast Channel
//!
//! The cross-context coordination medium: an origin-scoped, persistent
//! key/value store with change notifications delivered to every context
//! except the writer. Last write wins per key; no ordering across keys.
//!
//! If no medium is available the client degrades to a single-context
//! unconditional leader; that degradation lives in the client, not here.

mod errors;
mod key;
mod medium;
mod payload;

pub use errors::{BroadcastError, BroadcastResult};
pub use key::{KeyPurpose, KeySet};
pub use medium::{BroadcastMedium, MediumHandle, MemoryMedium, MessageHandler, SubscriberId};
pub use payload::{LeaderRecord, MutationEnvelope};
