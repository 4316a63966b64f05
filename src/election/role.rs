//! # Context Role
//!
//! Exactly one role holds per context at any instant. Across all live
//! contexts in one origin, at most one should hold `Leader` at steady
//! state; transient multi-leader or zero-leader windows during election
//! are tolerated and resolve within one election cycle.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Role of one context in the shared-log group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Running an election, outcome pending
    Candidate,
    /// Holds the live server connection and heartbeats the claim
    Leader,
    /// Relies on replication; watches for leader death
    Follower,
}

impl Role {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Leader => "leader",
            Role::Follower => "follower",
        }
    }

    /// Check if this is the leader role
    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader)
    }

    /// Check if this is the follower role
    pub fn is_follower(&self) -> bool {
        matches!(self, Role::Follower)
    }

    /// Check if this is the candidate role
    pub fn is_candidate(&self) -> bool {
        matches!(self, Role::Candidate)
    }
}

impl Default for Role {
    /// Every context starts as a candidate
    fn default() -> Self {
        Role::Candidate
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback invoked on each role change
pub type RoleListener = Arc<dyn Fn(Role) + Send + Sync>;

/// Shared holder of a context's current role
///
/// Role changes announce exactly once per change; setting the same
/// role again is a no-op. The coordinator separates `swap` from
/// `announce` so timers and the sync engine are adjusted before
/// listeners observe the new role.
pub struct RoleCell {
    role: Mutex<Role>,
    on_change: RwLock<Option<RoleListener>>,
}

impl Default for RoleCell {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleCell {
    /// Create a cell holding the initial `Candidate` role
    pub fn new() -> Self {
        Self {
            role: Mutex::new(Role::default()),
            on_change: RwLock::new(None),
        }
    }

    /// Current role
    pub fn get(&self) -> Role {
        self.role.lock().map(|role| *role).unwrap_or_default()
    }

    /// Register the change listener
    pub fn set_on_change(&self, listener: RoleListener) {
        if let Ok(mut slot) = self.on_change.write() {
            *slot = Some(listener);
        }
    }

    /// Store a new role without announcing; returns whether it changed
    pub fn swap(&self, role: Role) -> bool {
        let Ok(mut current) = self.role.lock() else {
            return false;
        };
        if *current == role {
            return false;
        }
        *current = role;
        true
    }

    /// Invoke the change listener for an already stored role
    pub fn announce(&self, role: Role) {
        let listener = self
            .on_change
            .read()
            .ok()
            .and_then(|slot| slot.clone());
        if let Some(listener) = listener {
            listener(role);
        }
    }

    /// Store and, if changed, announce; returns whether it changed
    pub fn set(&self, role: Role) -> bool {
        if self.swap(role) {
            self.announce(role);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_initial_role_is_candidate() {
        let cell = RoleCell::new();
        assert_eq!(cell.get(), Role::Candidate);
    }

    #[test]
    fn test_set_announces_once_per_change() {
        let cell = RoleCell::new();
        let announced = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&announced);
        cell.set_on_change(Arc::new(move |_role| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(cell.set(Role::Leader));
        assert!(!cell.set(Role::Leader));
        assert!(cell.set(Role::Follower));

        assert_eq!(announced.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_swap_does_not_announce() {
        let cell = RoleCell::new();
        let announced = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&announced);
        cell.set_on_change(Arc::new(move |_role| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(cell.swap(Role::Follower));
        assert_eq!(announced.load(Ordering::SeqCst), 0);
        assert_eq!(cell.get(), Role::Follower);
    }

    #[test]
    fn test_role_predicates() {
        assert!(Role::Leader.is_leader());
        assert!(Role::Follower.is_follower());
        assert!(Role::Candidate.is_candidate());
        assert!(!Role::Candidate.is_leader());
    }
}
