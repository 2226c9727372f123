use serde::Serialize;

use crate::{
    dto::phase::VisiblePhase,
    state::state_machine::{FinalFiveReason, Outcome},
};

/// Notification pushed to UI subscribers after a state change.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    /// The phase controller moved.
    PhaseChanged {
        /// New phase.
        phase: VisiblePhase,
        /// Bonus round reason, while it is active.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<FinalFiveReason>,
        /// Outcome once the session is over.
        #[serde(skip_serializing_if = "Option::is_none")]
        outcome: Option<Outcome>,
    },
    /// One second elapsed on the countdown.
    TimerTick {
        /// Seconds left.
        time_remaining: u32,
    },
    /// A slot started its opening animation.
    RevealStarted {
        /// Slot index.
        fact_index: usize,
    },
    /// A slot was committed.
    RevealCommitted {
        /// Slot index.
        fact_index: usize,
    },
    /// A guess was appended to the ledger.
    GuessRecorded {
        /// Text as submitted.
        text: String,
        /// Verifier verdict.
        is_correct: bool,
        /// Wrong guesses still allowed in the regular round.
        guesses_remaining: usize,
    },
    /// Verification failed; the player may resubmit.
    GuessFailed {
        /// Human-readable failure.
        message: String,
    },
    /// A Final Five fetch attempt failed and another one is scheduled.
    SlowConnection {
        /// Failed attempt number, starting at 1.
        attempt: u32,
        /// Attempts allowed per fetch.
        max_attempts: u32,
    },
    /// Every Final Five fetch attempt failed.
    FinalFiveUnavailable,
    /// The restored snapshot was inconsistent and was repaired.
    SessionRepaired {
        /// What was repaired.
        reason: String,
    },
    /// The session was discarded and started over.
    SessionReset {
        /// Why the session was reset.
        reason: String,
    },
    /// Durable storage failed; the session continues in memory only.
    StorageDegraded,
}

impl SessionNotice {
    /// Event name used by transports that label messages (SSE, bridge channels).
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionNotice::PhaseChanged { .. } => "phase_changed",
            SessionNotice::TimerTick { .. } => "timer.tick",
            SessionNotice::RevealStarted { .. } => "reveal.started",
            SessionNotice::RevealCommitted { .. } => "reveal.committed",
            SessionNotice::GuessRecorded { .. } => "guess.recorded",
            SessionNotice::GuessFailed { .. } => "guess.failed",
            SessionNotice::SlowConnection { .. } => "final_five.slow_connection",
            SessionNotice::FinalFiveUnavailable => "final_five.unavailable",
            SessionNotice::SessionRepaired { .. } => "session.repaired",
            SessionNotice::SessionReset { .. } => "session.reset",
            SessionNotice::StorageDegraded => "storage.degraded",
        }
    }
}
