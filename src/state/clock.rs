//! Authoritative countdown for a session.
//!
//! The countdown only counts: the driver in [`crate::services::timer_service`] owns the one
//! second interval and feeds [`Countdown::tick`]. Wall-clock timestamps are only used to anchor
//! the countdown so it can be resumed after a reload without handing back the time the player
//! spent away.

use time::OffsetDateTime;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown is stopped; the tick was not applied.
    Idle,
    /// One second was consumed, the value is the time left.
    Running(u32),
    /// The countdown just reached zero and stopped itself.
    Expired,
}

/// State of a countdown rebuilt from a persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    /// The countdown was stopped when persisted and stays stopped.
    Stopped,
    /// The countdown keeps running with the recomputed remaining time.
    Running,
    /// The time ran out while the player was away.
    Expired,
}

/// One-second granularity countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u32,
    active: bool,
    started_at: Option<OffsetDateTime>,
    started_with: Option<u32>,
}

impl Countdown {
    /// Create a stopped countdown holding `budget_secs`.
    pub fn new(budget_secs: u32) -> Self {
        Self {
            remaining_secs: budget_secs,
            active: false,
            started_at: None,
            started_with: None,
        }
    }

    /// Seconds left on the countdown.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Whether ticks are currently applied.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Instant the countdown was (re)started, present while active.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    /// Remaining seconds at [`Countdown::started_at`].
    pub fn started_with(&self) -> Option<u32> {
        self.started_with
    }

    /// Start the countdown. Returns `false` when it was already running or has nothing left.
    pub fn start(&mut self, now: OffsetDateTime) -> bool {
        if self.active || self.remaining_secs == 0 {
            return false;
        }

        self.active = true;
        self.started_at = Some(now);
        self.started_with = Some(self.remaining_secs);
        true
    }

    /// Consume one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.active {
            return TickOutcome::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.stop();
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining_secs)
        }
    }

    /// Stop the countdown, keeping the remaining time. Returns `false` if it was not running.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.started_at = None;
        self.started_with = None;
        was_active
    }

    /// Stop the countdown and load a new budget (used by the bonus round).
    pub fn reset(&mut self, budget_secs: u32) {
        self.stop();
        self.remaining_secs = budget_secs;
    }

    /// Rebuild a countdown from persisted fields, deducting the wall-clock time elapsed since
    /// `started_at`.
    ///
    /// `started_with` is the remaining time captured at `started_at`; when it is missing the
    /// persisted `remaining_secs` is used as the anchor instead. The result never exceeds the
    /// persisted remaining time and is clamped at zero, in which case [`Resumed::Expired`] is
    /// reported and the countdown is left stopped.
    pub fn resume_from_persisted(
        remaining_secs: u32,
        was_active: bool,
        started_at: Option<OffsetDateTime>,
        started_with: Option<u32>,
        now: OffsetDateTime,
    ) -> (Self, Resumed) {
        let mut countdown = Self::new(remaining_secs);
        let Some(started_at) = started_at.filter(|_| was_active) else {
            return (countdown, Resumed::Stopped);
        };

        let anchor = started_with.unwrap_or(remaining_secs);
        let elapsed = elapsed_secs(started_at, now);
        let left = u64::from(anchor)
            .saturating_sub(elapsed)
            .min(u64::from(remaining_secs));
        // `left` is bounded by a u32 above.
        countdown.remaining_secs = u32::try_from(left).unwrap_or(remaining_secs);

        if countdown.remaining_secs == 0 {
            return (countdown, Resumed::Expired);
        }

        countdown.start(now);
        (countdown, Resumed::Running)
    }
}

/// Whole seconds between `since` and `now`, zero when the clock went backwards.
pub fn elapsed_secs(since: OffsetDateTime, now: OffsetDateTime) -> u64 {
    u64::try_from((now - since).whole_seconds()).unwrap_or(0)
}
