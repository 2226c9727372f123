//! Messages flowing into the session reducer and side effects flowing out of it.

use std::time::Duration;

use crate::{
    dao::models::SessionEntity,
    dto::notice::SessionNotice,
    state::{ledger::GuessId, reveal::RevealId},
};

/// Every input the session reacts to, whatever produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second elapsed on the running countdown.
    TickElapsed,
    /// The player dropped a card on the stack.
    RevealStarted {
        /// Slot to reveal.
        fact_index: usize,
    },
    /// The reveal animation finished.
    RevealCommitted {
        /// Ticket handed out when the reveal started.
        reveal_id: RevealId,
    },
    /// The player submitted a guess.
    GuessSubmitted {
        /// Raw text.
        text: String,
    },
    /// The verifier answered.
    GuessResolved {
        /// Ticket of the verified guess.
        guess_id: GuessId,
        /// Verdict.
        is_correct: bool,
    },
    /// The verifier could not be reached.
    GuessFailed {
        /// Ticket of the guess.
        guess_id: GuessId,
        /// Failure description.
        reason: String,
    },
    /// Final Five options arrived.
    FinalFiveLoaded {
        /// Shuffled options, answer included.
        options: Vec<String>,
    },
    /// A Final Five fetch attempt failed and a retry is scheduled.
    FinalFiveAttemptFailed {
        /// Failed attempt number, starting at 1.
        attempt: u32,
        /// Attempts allowed per fetch.
        max_attempts: u32,
    },
    /// Every Final Five fetch attempt failed.
    FinalFiveUnavailable,
    /// The player asked to try fetching the options again.
    FinalFiveRetryRequested,
    /// A snapshot was read back from storage on load.
    Rehydrated(Box<SessionEntity>),
}

/// Reveal commit the driver must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTicket {
    /// Ticket to present on commit.
    pub id: RevealId,
    /// Slot being revealed.
    pub fact_index: usize,
    /// Delay before the commit fires.
    pub commit_after: Duration,
}

/// Verification request for the answer verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    /// Ticket the response must carry.
    pub guess_id: GuessId,
    /// Puzzle being played.
    pub challenge_id: String,
    /// Trimmed guess text.
    pub text: String,
    /// Verification language.
    pub language: String,
}

/// Option request for the Final Five source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalFiveRequest {
    /// Puzzle being played.
    pub challenge_id: String,
    /// Every recorded guess text, skips excluded.
    pub previous_guesses: Vec<String>,
    /// Option language.
    pub language: String,
}

/// Side effects requested by the reducer, executed by the driver once the session lock is
/// released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the one-second interval.
    StartTicker,
    /// Cancel the one-second interval.
    StopTicker,
    /// Fire [`SessionEvent::RevealCommitted`] after the ticket delay.
    ScheduleRevealCommit(RevealTicket),
    /// Call the answer verifier once.
    VerifyGuess(VerifyRequest),
    /// Fetch the Final Five options with the retry policy.
    FetchFinalFiveOptions(FinalFiveRequest),
    /// Publish a notice to subscribers.
    Notify(SessionNotice),
}
