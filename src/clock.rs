//! Injected wall-clock capability.
//!
//! The directory lister needs to compare "now" against a deadline without
//! calling `Instant::now()` directly, so pause-by-deadline behavior stays
//! deterministic under test.

use std::time::{Duration, Instant};

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that can be advanced manually, for deterministic pause/deadline tests.
#[derive(Debug)]
pub struct TestClock {
    current: std::sync::Mutex<Instant>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current.lock().expect("clock mutex poisoned")
    }
}
