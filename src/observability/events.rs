//! Observable lifecycle events
//!
//! Every externally visible transition of a client maps to one typed
//! event. Events are explicit so log consumers can match on stable names.

use std::fmt;

/// Observable events in a coordinated client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Client lifecycle
    /// Client startup requested
    ClientStart,
    /// Client shutdown requested
    ClientDestroy,
    /// Client state wipe requested
    ClientClean,

    // Election protocol
    /// Election run begins (initial start or watchdog expiry)
    ElectionStart,
    /// Election timer resolved in favor of this context
    ElectionWon,
    /// Election timer resolved in favor of another context
    ElectionLost,
    /// Context role changed
    RoleChange,
    /// No leader heartbeat arrived within the watchdog timeout
    WatchdogExpired,
    /// Leader republished its claim
    LeaderHeartbeat,

    // Replication
    /// Local mutation published to the broadcast medium
    MutationBroadcast,
    /// Remote mutation applied into the local store
    MutationApplied,
    /// A broadcast value failed the shape check and was dropped
    PayloadDiscarded,

    // Collaborators
    /// Transport error surfaced by the sync engine
    SyncError,
    /// Plaintext server URL configured without an explicit opt-in
    InsecureUrl,
}

impl Event {
    /// Returns the stable event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ClientStart => "CLIENT_START",
            Event::ClientDestroy => "CLIENT_DESTROY",
            Event::ClientClean => "CLIENT_CLEAN",
            Event::ElectionStart => "ELECTION_START",
            Event::ElectionWon => "ELECTION_WON",
            Event::ElectionLost => "ELECTION_LOST",
            Event::RoleChange => "ROLE_CHANGE",
            Event::WatchdogExpired => "WATCHDOG_EXPIRED",
            Event::LeaderHeartbeat => "LEADER_HEARTBEAT",
            Event::MutationBroadcast => "MUTATION_BROADCAST",
            Event::MutationApplied => "MUTATION_APPLIED",
            Event::PayloadDiscarded => "PAYLOAD_DISCARDED",
            Event::SyncError => "SYNC_ERROR",
            Event::InsecureUrl => "INSECURE_URL",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
