//! # Election Coordinator
//!
//! Runs the leader-election state machine on the broadcast medium.
//! There is no mutual exclusion: correctness relies on last-write-wins
//! per key plus timeout-based resolution. A context claims leadership,
//! waits a fixed election delay, and keeps the role only if the medium
//! still names it afterwards; everyone else follows and watches for the
//! leader's heartbeat to stop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use super::clock::Clock;
use super::role::{Role, RoleCell};
use super::timer::TimerHandle;
use crate::broadcast::{BroadcastMedium, KeySet, LeaderRecord};
use crate::observability::{log_event, Event, Severity};
use crate::store::ContextId;
use crate::sync::SyncEngine;

/// Protocol intervals, in milliseconds
///
/// The watchdog timeout is randomized per context within
/// `[base, base + jitter)` to de-correlate re-elections; all other
/// intervals are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionTiming {
    /// Maximum age of a leader record before it counts as "no leader"
    pub freshness_ms: u64,

    /// Delay between claiming leadership and checking who won
    pub election_ms: u64,

    /// Interval between leader claim republishes
    pub heartbeat_ms: u64,

    /// Lower bound of the follower watchdog timeout
    pub watchdog_base_ms: u64,

    /// Width of the per-context watchdog randomization
    pub watchdog_jitter_ms: u64,
}

impl Default for ElectionTiming {
    fn default() -> Self {
        Self {
            freshness_ms: 5000,
            election_ms: 1000,
            heartbeat_ms: 2000,
            watchdog_base_ms: 3000,
            watchdog_jitter_ms: 2000,
        }
    }
}

#[derive(Default)]
struct Timers {
    watchdog: Option<TimerHandle>,
    election: Option<TimerHandle>,
    heartbeat: Option<TimerHandle>,
}

struct Inner {
    context_id: ContextId,
    keys: KeySet,
    medium: Arc<dyn BroadcastMedium>,
    sync: Arc<dyn SyncEngine>,
    role: Arc<RoleCell>,
    clock: Clock,
    timing: ElectionTiming,
    watchdog_timeout: Duration,
    timers: Mutex<Timers>,
}

/// Leader-election state machine for one context
///
/// Timer callbacks hold only weak references, so dropping every
/// coordinator handle stops all scheduled work even without an explicit
/// `destroy`.
#[derive(Clone)]
pub struct ElectionCoordinator {
    inner: Arc<Inner>,
}

impl ElectionCoordinator {
    /// Create a coordinator; does not start an election
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context_id: ContextId,
        keys: KeySet,
        medium: Arc<dyn BroadcastMedium>,
        sync: Arc<dyn SyncEngine>,
        role: Arc<RoleCell>,
        clock: Clock,
        timing: ElectionTiming,
    ) -> Self {
        let jitter = if timing.watchdog_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..timing.watchdog_jitter_ms)
        };
        let watchdog_timeout = Duration::from_millis(timing.watchdog_base_ms + jitter);

        Self {
            inner: Arc::new(Inner {
                context_id,
                keys,
                medium,
                sync,
                role,
                clock,
                timing,
                watchdog_timeout,
                timers: Mutex::new(Timers::default()),
            }),
        }
    }

    /// Run (or re-run) the election
    ///
    /// Must be called from within a tokio runtime. Safe to call again
    /// at any time; timers from the previous run are replaced, never
    /// duplicated.
    pub fn start(&self) {
        Inner::start(&self.inner);
    }

    /// Cancel all timers; no role transition, medium left untouched
    pub fn destroy(&self) {
        self.inner.cancel_all();
    }

    /// A value was written under the leader key by another context
    ///
    /// A well-formed foreign claim is treated as a heartbeat from the
    /// current leader: this context yields if it was leader or
    /// candidate, and re-arms its watchdog. A value that fails the
    /// shape check is discarded without any role change.
    pub fn on_leader_notice(&self, value: &Value) {
        Inner::on_leader_notice(&self.inner, value);
    }

    /// Current role
    pub fn role(&self) -> Role {
        self.inner.role.get()
    }

    /// This context's randomized watchdog timeout
    pub fn watchdog_timeout(&self) -> Duration {
        self.inner.watchdog_timeout
    }
}

impl Inner {
    fn start(this: &Arc<Self>) {
        let context = this.context_id.to_string();
        log_event(Severity::Info, Event::ElectionStart, &[("context", &context)]);

        let now = this.clock.now_millis();
        let fresh = this
            .read_leader()
            .map(|record| record.is_fresh(now, this.timing.freshness_ms))
            .unwrap_or(false);

        if fresh {
            Inner::set_role(this, Role::Follower);
            Inner::arm_watchdog(this);
        } else {
            this.claim_leadership();
            Inner::set_role(this, Role::Candidate);
            Inner::arm_election(this);
        }
    }

    fn read_leader(&self) -> Option<LeaderRecord> {
        let value = self.medium.get(&self.keys.leader())?;
        match LeaderRecord::from_value(&value) {
            Ok(record) => Some(record),
            Err(err) => {
                log_event(
                    Severity::Warn,
                    Event::PayloadDiscarded,
                    &[
                        ("context", &self.context_id.to_string()),
                        ("key", &self.keys.leader()),
                        ("reason", &err.to_string()),
                    ],
                );
                None
            }
        }
    }

    fn claim_leadership(&self) {
        let record = LeaderRecord::new(self.context_id, self.clock.now_millis());
        self.medium.publish(&self.keys.leader(), record.to_value());
    }

    fn heartbeat(&self) {
        log_event(
            Severity::Trace,
            Event::LeaderHeartbeat,
            &[("context", &self.context_id.to_string())],
        );
        self.claim_leadership();
    }

    fn arm_election(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        let timer = TimerHandle::once(
            Duration::from_millis(this.timing.election_ms),
            move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::resolve_election(&inner);
                }
            },
        );
        if let Ok(mut timers) = this.timers.lock() {
            timers.election = Some(timer);
        }
    }

    fn resolve_election(this: &Arc<Self>) {
        let context = this.context_id.to_string();
        match this.read_leader() {
            Some(record) if record.context_id == this.context_id => {
                log_event(Severity::Info, Event::ElectionWon, &[("context", &context)]);
                Inner::set_role(this, Role::Leader);
            }
            _ => {
                log_event(Severity::Info, Event::ElectionLost, &[("context", &context)]);
                Inner::set_role(this, Role::Follower);
                Inner::arm_watchdog(this);
            }
        }
    }

    fn arm_watchdog(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        let timer = TimerHandle::once(this.watchdog_timeout, move || {
            if let Some(inner) = weak.upgrade() {
                log_event(
                    Severity::Info,
                    Event::WatchdogExpired,
                    &[("context", &inner.context_id.to_string())],
                );
                Inner::start(&inner);
            }
        });
        if let Ok(mut timers) = this.timers.lock() {
            timers.watchdog = Some(timer);
        }
    }

    fn on_leader_notice(this: &Arc<Self>, value: &Value) {
        let record = match LeaderRecord::from_value(value) {
            Ok(record) => record,
            Err(err) => {
                log_event(
                    Severity::Warn,
                    Event::PayloadDiscarded,
                    &[
                        ("context", &this.context_id.to_string()),
                        ("key", &this.keys.leader()),
                        ("reason", &err.to_string()),
                    ],
                );
                return;
            }
        };

        // The medium never delivers a context's own writes, but an
        // echoed self-claim must not demote the leader that made it
        if record.context_id == this.context_id {
            return;
        }

        Inner::set_role(this, Role::Follower);
        Inner::arm_watchdog(this);
    }

    /// Apply a role change: adjust timers and the sync engine before
    /// listeners observe the new role. No-op when unchanged.
    fn set_role(this: &Arc<Self>, role: Role) {
        if !this.role.swap(role) {
            return;
        }

        {
            let Ok(mut timers) = this.timers.lock() else {
                return;
            };
            timers.watchdog = None;
            if role.is_leader() {
                let weak = Arc::downgrade(this);
                timers.heartbeat = Some(TimerHandle::interval(
                    Duration::from_millis(this.timing.heartbeat_ms),
                    move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.heartbeat();
                        }
                    },
                ));
            } else {
                timers.election = None;
                timers.heartbeat = None;
            }
        }

        if role.is_leader() {
            this.sync.connect();
        } else if !this.sync.state().is_idle() {
            this.sync.disconnect();
        }

        this.role.announce(role);
    }

    fn cancel_all(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            *timers = Timers::default();
        }
    }
}
