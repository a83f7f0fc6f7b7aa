//! Nanosecond clock sources
//!
//! The accumulators never read wall time themselves; they ask a [`Clock`].
//! [`MonotonicClock`] is what a running scheduler uses. [`ManualClock`] is
//! driven explicitly and makes every transition reproducible in tests and
//! simulations.
//!
//! # Example
//!
//! ```
//! use taskclock::clock::{Clock, ManualClock};
//!
//! let clock = ManualClock::new(100);
//! assert_eq!(clock.now_nanos(), 100);
//!
//! clock.advance(50);
//! assert_eq!(clock.now_nanos(), 150);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonically non-decreasing nanosecond timestamp source
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current timestamp in nanoseconds
    fn now_nanos(&self) -> u64;
}

/// Clock backed by [`Instant`], measuring nanoseconds since construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> u64 {
        // u64 nanoseconds cover ~584 years of uptime
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Explicitly driven clock
///
/// Thread-safe; `set` refuses to move backwards so the clock stays
/// monotonic even when several threads drive it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub const fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock to `ts` (ignored if `ts` is in the past)
    pub fn set(&self, ts: u64) {
        self.now.fetch_max(ts, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta` and return the new time
    pub fn advance(&self, delta: u64) -> u64 {
        self.now.fetch_add(delta, Ordering::SeqCst) + delta
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
