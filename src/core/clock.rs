//! Injected Time Source
//!
//! The simulation never reads wall-clock time directly. Every tick is
//! handed a millisecond timestamp taken from a [`Clock`], so tests can
//! freeze and advance time deterministically.

use std::cell::Cell;
use std::time::Instant;

/// Milliseconds on the session's time axis.
///
/// Signed so that re-basing imported timestamps can move them before zero.
pub type Millis = i64;

/// Source of "now" in milliseconds.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> Millis;
}

/// Monotonic wall clock measured from its own creation.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Manually driven clock for tests and scripted replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Millis) -> Self {
        Self { now: Cell::new(start) }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Move time forward by `ms`.
    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}
