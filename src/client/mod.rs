//! # Coordinated Client
//!
//! The composition layer: configuration, the typed event surface, and
//! the client that wires the election coordinator, the log replicator,
//! and the store/sync collaborators together.

mod client;
mod config;
mod errors;
mod events;

pub use client::CoordinatedClient;
pub use config::ClientConfig;
pub use errors::{ClientError, ClientResult};
pub use events::{ClientEvent, EventBus, EventKind, EventListener, EventSubscription};
