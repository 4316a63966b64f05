//! # Client Configuration
//!
//! Plain configuration struct, validated once at client construction.
//! Missing required parameters are fatal; collaborators left unset fall
//! back to in-process defaults (memory store, no-op sync engine, no
//! medium and therefore no cross-context coordination).

use std::fmt;
use std::sync::Arc;

use super::errors::{ClientError, ClientResult};
use crate::broadcast::BroadcastMedium;
use crate::election::{Clock, ElectionTiming};
use crate::store::{ContextId, Store};
use crate::sync::SyncEngine;

/// Configuration for a coordinated client
pub struct ClientConfig {
    /// Server URL handed to the sync engine
    pub url: String,

    /// Application subprotocol version, SemVer format
    pub subprotocol: String,

    /// User scope isolating broadcast keys per user session
    pub user_scope: Option<String>,

    /// Key namespace prefix, so multiple clients can share one medium
    pub prefix: String,

    /// Suppress the warning for plaintext `ws://` URLs
    pub allow_insecure_url: bool,

    /// Fixed context id; generated when absent
    pub context_id: Option<ContextId>,

    /// Election protocol intervals
    pub timing: ElectionTiming,

    /// Millisecond clock shared by all contexts of one origin
    pub clock: Clock,

    /// Broadcast medium; `None` degrades to single-context leader mode
    pub medium: Option<Arc<dyn BroadcastMedium>>,

    /// Log store; defaults to an in-memory store
    pub store: Option<Arc<dyn Store>>,

    /// Sync engine; defaults to a no-op engine
    pub sync: Option<Arc<dyn SyncEngine>>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the required
    /// parameters
    pub fn new(url: impl Into<String>, subprotocol: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subprotocol: subprotocol.into(),
            user_scope: None,
            prefix: "crosslog".to_string(),
            allow_insecure_url: false,
            context_id: None,
            timing: ElectionTiming::default(),
            clock: Clock::system(),
            medium: None,
            store: None,
            sync: None,
        }
    }

    /// Validate the configuration
    ///
    /// Called by the client constructor; failures abort startup.
    pub fn validate(&self) -> ClientResult<()> {
        if self.url.is_empty() {
            return Err(ClientError::config("url must not be empty"));
        }
        if self.subprotocol.is_empty() {
            return Err(ClientError::config("subprotocol must not be empty"));
        }
        if self.prefix.is_empty() {
            return Err(ClientError::config("prefix must not be empty"));
        }

        let timing = &self.timing;
        if timing.freshness_ms == 0
            || timing.election_ms == 0
            || timing.heartbeat_ms == 0
            || timing.watchdog_base_ms == 0
        {
            return Err(ClientError::config(
                "election intervals must be non-zero",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("subprotocol", &self.subprotocol)
            .field("user_scope", &self.user_scope)
            .field("prefix", &self.prefix)
            .field("allow_insecure_url", &self.allow_insecure_url)
            .field("context_id", &self.context_id)
            .field("timing", &self.timing)
            .field("medium", &self.medium.is_some())
            .field("store", &self.store.is_some())
            .field("sync", &self.sync.is_some())
            .finish()
    }
}
