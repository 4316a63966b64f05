//! # Sync Engine Capability
//!
//! The network-facing collaborator. Only the leader context holds a
//! live connection; followers keep their engine disconnected and rely
//! on replication. The engine owns its own reconnect/backoff and wire
//! protocol; this crate only instructs it and observes its state.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Connection state reported by a sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No connection and none pending
    Disconnected,
    /// Waiting before a reconnect attempt
    Wait,
    /// Connection being established
    Connecting,
    /// Connected, pushing local history
    Sending,
    /// Connected and fully synchronized
    Synchronized,
}

impl SyncState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Disconnected => "disconnected",
            SyncState::Wait => "wait",
            SyncState::Connecting => "connecting",
            SyncState::Sending => "sending",
            SyncState::Synchronized => "synchronized",
        }
    }

    /// Whether the engine holds no live or pending connection
    ///
    /// Idle engines are not told to disconnect on role loss.
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Disconnected | SyncState::Wait)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback invoked with transport error descriptions
pub type SyncErrorListener = Arc<dyn Fn(&str) + Send + Sync>;

/// The sync engine capability
///
/// `connect`/`disconnect` are synchronous instructions; the engine owns
/// its own async lifecycle. Transport errors flow through `on_error`
/// for logging only and never affect election state.
pub trait SyncEngine: Send + Sync {
    /// Establish (and keep re-establishing) the server connection
    fn connect(&self);

    /// Drop the server connection
    fn disconnect(&self);

    /// Current connection state
    fn state(&self) -> SyncState;

    /// Register a transport error listener
    fn on_error(&self, listener: SyncErrorListener);
}

/// No-op sync engine
///
/// Default engine for clients without a transport wired in. Tracks the
/// instructed state and counts instructions so composition can be
/// observed.
#[derive(Default)]
pub struct NullSyncEngine {
    state: RwLock<Option<SyncState>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    error_listener: Mutex<Option<SyncErrorListener>>,
}

impl NullSyncEngine {
    /// Create a disconnected engine
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `connect` was instructed
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// How many times `disconnect` was instructed
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl SyncEngine for NullSyncEngine {
    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state.write() {
            *state = Some(SyncState::Synchronized);
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state.write() {
            *state = Some(SyncState::Disconnected);
        }
    }

    fn state(&self) -> SyncState {
        self.state
            .read()
            .ok()
            .and_then(|state| *state)
            .unwrap_or(SyncState::Disconnected)
    }

    fn on_error(&self, listener: SyncErrorListener) {
        if let Ok(mut slot) = self.error_listener.lock() {
            *slot = Some(listener);
        }
    }
}
