//! Wall-clock sources used to stamp reveals, guesses and countdown anchors.

use std::sync::Mutex;

use time::{Duration, OffsetDateTime};
use tokio::time::Instant;

/// Supplies the current wall-clock time.
pub trait TimeSource: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Wall clock that advances with tokio's clock, so paused test time moves it too.
#[derive(Debug, Clone, Copy)]
pub struct TokioTimeSource {
    origin: OffsetDateTime,
    started: Instant,
}

impl TokioTimeSource {
    /// Anchor the source at `origin`; it then advances with [`tokio::time::Instant`].
    pub fn new(origin: OffsetDateTime) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }
}

impl TimeSource for TokioTimeSource {
    fn now(&self) -> OffsetDateTime {
        let elapsed = Duration::try_from(self.started.elapsed()).unwrap_or(Duration::ZERO);
        self.origin + elapsed
    }
}

/// Clock moved by hand.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<OffsetDateTime>,
}

impl ManualTimeSource {
    /// Start at `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        *self.lock() = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.lock() += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OffsetDateTime> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> OffsetDateTime {
        *self.lock()
    }
}
