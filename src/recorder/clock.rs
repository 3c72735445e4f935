//! Time sources for the recording manager, in seconds from an arbitrary origin.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub trait Clock {
    /// Monotonic seconds. Only differences between readings matter.
    fn now(&self) -> f64;
}

/// Wall-clock time for native hosts.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Clones share the same reading, so a
/// host (or a test) keeps one handle and gives another to the manager.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    /// Jump to `seconds`. Earlier readings are ignored so time never runs
    /// backwards.
    pub fn set(&self, seconds: f64) {
        if seconds.is_finite() && seconds > self.seconds.get() {
            self.seconds.set(seconds);
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.seconds.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(1.5);
        assert_eq!(clock.now(), 1.5);
        handle.set(2.0);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn manual_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(3.0);
        clock.set(1.0);
        clock.advance(-2.0);
        clock.set(f64::NAN);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a && a >= 0.0);
    }
}
