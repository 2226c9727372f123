use std::{io, path::PathBuf};

use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::state::state_machine::InvalidTransition;

/// Reasons a command or callback was refused by the session.
///
/// A rejection never leaves partial state behind: the session is exactly as it was before the
/// event was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Fact index does not exist in this challenge.
    #[error("fact {index} is out of range (challenge has {count} facts)")]
    FactOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of fact slots.
        count: usize,
    },
    /// The slot is already pending or revealed.
    #[error("fact {0} is not hidden")]
    SlotNotHidden(usize),
    /// Another reveal has not been committed yet.
    #[error("fact {0} is still being revealed")]
    RevealAlreadyPending(usize),
    /// Reveals are not allowed in the current phase.
    #[error("reveals are closed in the current phase")]
    RevealsClosed,
    /// A commit arrived while nothing was pending.
    #[error("no reveal is pending")]
    NoPendingReveal,
    /// A commit arrived for a reveal that is not the pending one.
    #[error("reveal ticket mismatch (expected {expected}, got {got})")]
    RevealTicketMismatch {
        /// Ticket of the pending reveal.
        expected: Uuid,
        /// Ticket carried by the commit.
        got: Uuid,
    },
    /// Guesses are not allowed in the current phase.
    #[error("guessing is closed in the current phase")]
    GuessingClosed,
    /// No clue has been opened in this session.
    #[error("no clue has been seen yet")]
    NoClueSeen,
    /// The last guess consumed the revealed clue.
    #[error("reveal another fact before guessing again")]
    GuessNotAllowed,
    /// Clues were opened but none has been committed.
    #[error("no fact has been committed yet")]
    NoCommittedFact,
    /// A guess is waiting on the verifier.
    #[error("a guess is already being verified")]
    GuessInFlight,
    /// Guess text is blank after normalization.
    #[error("guess must not be empty")]
    EmptyGuess,
    /// The same normalized guess was already recorded.
    #[error("`{0}` has already been guessed")]
    DuplicateGuess(String),
    /// A bonus-round guess that is not among the offered options.
    #[error("`{0}` is not one of the Final Five options")]
    NotAnOption(String),
    /// A verifier response arrived while nothing was in flight.
    #[error("no guess is being verified")]
    NoGuessInFlight,
    /// A verifier response arrived for another guess.
    #[error("guess ticket mismatch (expected {expected}, got {got})")]
    GuessTicketMismatch {
        /// Ticket of the in-flight guess.
        expected: Uuid,
        /// Ticket carried by the response.
        got: Uuid,
    },
    /// Final Five option events outside of the loading phase.
    #[error("Final Five options are not being fetched")]
    FinalFiveNotLoading,
    /// A retry was requested while a fetch is still running.
    #[error("Final Five options are still being fetched")]
    FinalFiveFetchRunning,
    /// The option source returned the wrong number of options.
    #[error("expected {expected} Final Five options, got {got}")]
    MalformedOptions {
        /// Required option count.
        expected: usize,
        /// Received option count.
        got: usize,
    },
    /// A tick arrived while the countdown is stopped.
    #[error("timer is not running")]
    TimerInactive,
    /// Rehydration attempted on a session that already moved.
    #[error("session already started; rehydration is only allowed on a fresh session")]
    AlreadyStarted,
    /// The phase controller refused the transition.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Failures reported by the external collaborators (answer verification, option generation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The request could not be completed (network error, timeout, 5xx).
    #[error("collaborator request failed: {0}")]
    Transport(String),
    /// The collaborator answered with a payload the session cannot use.
    #[error("collaborator returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while loading the session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config `{path}`")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration is not valid JSON for [`crate::config::GameConfig`].
    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),
    /// The configuration parsed but violates a constraint.
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationErrors),
}
