//! # Timer Handles
//!
//! Explicit handles for the coordinator's scheduled work. Every state
//! transition cancels the timers not valid in the new state before
//! arming new ones; dropping a handle aborts its task, so replacing the
//! occupant of a slot can never leave two timers alive.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Handle to one scheduled callback
///
/// Must be created from within a tokio runtime. The task is aborted
/// when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Fire once after `delay`
    pub fn once(delay: Duration, callback: impl FnOnce() + Send + 'static) -> Self {
        let task = tokio::spawn(async move {
            sleep(delay).await;
            callback();
        });
        Self { task }
    }

    /// Fire every `period`, starting one period from now
    pub fn interval(period: Duration, callback: impl Fn() + Send + 'static) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        Self { task }
    }

    /// Abort the scheduled task
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
