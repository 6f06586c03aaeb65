//! Time sources.
//!
//! Schedules in the core are expressed as durations on a [`Clock`]. The
//! runner uses the wall clock; tests use [`ManualClock`] and advance it by
//! hand, so no test ever sleeps.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::physics::PHYSICS_DT;

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
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

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Advances by one physics frame.
    pub fn advance_frame(&self) {
        self.advance(frame_duration());
    }

    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock();
        if to < *now {
            tracing::warn!(?to, current = ?*now, "ManualClock cannot go backwards");
            return;
        }
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Wall-clock length of one physics frame.
pub fn frame_duration() -> Duration {
    Duration::from_secs_f32(PHYSICS_DT)
}
