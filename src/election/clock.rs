//! # Clock
//!
//! Injectable millisecond clock for election arithmetic. Leader record
//! timestamps must be comparable across contexts, so every context in
//! one origin uses the same clock source. Tests substitute a
//! deterministic clock driven by paused time.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

/// Millisecond clock handle
#[derive(Clone)]
pub struct Clock {
    now_fn: Arc<dyn Fn() -> i64 + Send + Sync>,
}

impl Clock {
    /// Wall-clock time
    pub fn system() -> Self {
        Self {
            now_fn: Arc::new(|| Utc::now().timestamp_millis()),
        }
    }

    /// Clock backed by an arbitrary source
    pub fn from_fn(now_fn: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            now_fn: Arc::new(now_fn),
        }
    }

    /// Current time in milliseconds
    pub fn now_millis(&self) -> i64 {
        (self.now_fn)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("now_millis", &self.now_millis())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = Clock::system();
        let a = clock.now_millis();
        let b = clock.now_millis();
        assert!(b >= a);
    }

    #[test]
    fn test_custom_clock_source() {
        let ticks = Arc::new(AtomicI64::new(100));
        let source = Arc::clone(&ticks);
        let clock = Clock::from_fn(move || source.load(Ordering::SeqCst));

        assert_eq!(clock.now_millis(), 100);
        ticks.store(250, Ordering::SeqCst);
        assert_eq!(clock.now_millis(), 250);
    }
}
