//! # Log Replication
//!
//! Keeps every context's store eventually consistent and delivers
//! exactly one application-visible notification per logical mutation
//! per context. Local mutations are re-broadcast tagged with their
//! origin; remote envelopes are applied through the local store's write
//! path with the origin tag acting as the echo suppressor.

mod replicator;

pub use replicator::LogReplicator;
