//! Time sources
//!
//! Cooldown expiry is computed from an injected [`Clock`] so that the
//! tracker can run on wall time in production and on a manually advanced
//! virtual clock during scenario replay and tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// `now + span`, shortened until the platform can represent it.
///
/// Never panics; for any sane `span` this is plain addition.
#[must_use]
pub fn saturating_add(now: Instant, span: Duration) -> Instant {
    let mut span = span;
    loop {
        if let Some(at) = now.checked_add(span) {
            return at;
        }
        span /= 2;
    }
}

/// Clock backed by the tokio timer.
///
/// Reads `tokio::time::Instant`, so it follows paused and advanced time in
/// `#[tokio::test(start_paused = true)]` tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.lock();
        *offset = offset.saturating_add(by);
    }

    /// Jumps to an absolute offset from the origin. Moving backwards is ignored.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut offset = self.lock();
        if elapsed > *offset {
            *offset = elapsed;
        }
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Duration> {
        self.offset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        saturating_add(self.origin, self.elapsed())
    }
}
