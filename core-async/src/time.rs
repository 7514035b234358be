//! Time-related abstractions.
//!
//! The scheduler never reads the wall clock directly. It asks a [`Clock`] for
//! the monotonic time elapsed since the clock was created, which lets tests
//! swap in a [`ManualClock`] and step time explicitly:
//!
//! ```rust
//! use core_async::time::{Clock, Duration, ManualClock};
//!
//! let clock = ManualClock::new();
//! assert_eq!(clock.now(), Duration::ZERO);
//!
//! clock.advance(Duration::from_millis(50));
//! assert_eq!(clock.now(), Duration::from_millis(50));
//! ```
//!
//! Tokio's timer primitives are re-exported for async code that needs to
//! sleep in real time (the scheduler driver loop).

pub use std::time::{Duration, Instant};
pub use tokio::time::{sleep, timeout};

use parking_lot::Mutex;
use std::fmt;

/// Monotonic time source.
///
/// `now` returns the time elapsed since an arbitrary, fixed origin. Values
/// never decrease.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
///
/// Used to make timer-driven behavior (poll loops, timeouts) deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at its origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed = elapsed.saturating_add(step);
    }

    /// Jump to an absolute offset from the origin. Moving backwards is ignored.
    pub fn set(&self, at: Duration) {
        let mut elapsed = self.elapsed.lock();
        if at > *elapsed {
            *elapsed = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.elapsed.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_millis(20));
        clock.advance(Duration::from_millis(30));
        assert_eq!(clock.now(), Duration::from_millis(50));
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(2));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
