//! # Leader Election
//!
//! Leaderless-to-leader coordination over the broadcast medium. Every
//! context starts as a candidate; whoever's claim the medium preserves
//! after the election delay leads, heartbeats its claim, and holds the
//! network connection. Followers watch the heartbeat and re-elect when
//! it stops.

mod clock;
mod coordinator;
mod role;
mod timer;

pub use clock::Clock;
pub use coordinator::{ElectionCoordinator, ElectionTiming};
pub use role::{Role, RoleCell, RoleListener};
pub use timer::TimerHandle;
