//! Append-only guess ledger.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{dao::models::GuessEntity, error::Rejection};

/// Sentinel submitted when the player skips a clue.
pub const SKIPPED_GUESS: &str = "___SKIPPED___";

/// Identifier of a guess waiting on the verifier.
pub type GuessId = Uuid;

/// A recorded guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessEntry {
    /// Text as submitted, trimmed.
    pub text: String,
    /// Case-folded text used for duplicate detection.
    pub normalized_text: String,
    /// Verifier verdict (always `false` for skips).
    pub is_correct: bool,
    /// Whether this was the single Final Five pick.
    pub is_final_five_guess: bool,
    /// When the guess was submitted.
    pub submitted_at: OffsetDateTime,
}

impl GuessEntry {
    /// Whether this entry is a skipped clue.
    pub fn is_skip(&self) -> bool {
        self.text == SKIPPED_GUESS
    }
}

/// Guess handed to the verifier and not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightGuess {
    /// Ticket the verifier response must carry.
    pub id: GuessId,
    /// Text as submitted, trimmed.
    pub text: String,
    /// Case-folded text.
    pub normalized_text: String,
    /// Whether this is the Final Five pick.
    pub is_final_five_guess: bool,
    /// When the guess was submitted.
    pub submitted_at: OffsetDateTime,
}

/// What happened to a submission accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// A skip, recorded immediately as a wrong guess.
    Skipped(GuessEntry),
    /// A real guess, now waiting on the verifier.
    Verifying(InFlightGuess),
}

/// Trim and case-fold a guess.
pub fn normalize_guess(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Recorded guesses plus the single in-flight verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessLedger {
    entries: Vec<GuessEntry>,
    in_flight: Option<InFlightGuess>,
    max_wrong: usize,
}

impl GuessLedger {
    /// Create an empty ledger allowing `max_wrong` wrong regular guesses.
    pub fn new(max_wrong: usize) -> Self {
        Self {
            entries: Vec::new(),
            in_flight: None,
            max_wrong,
        }
    }

    /// Rebuild a ledger from persisted entries.
    pub fn restore(max_wrong: usize, entries: Vec<GuessEntry>) -> Self {
        Self {
            entries,
            in_flight: None,
            max_wrong,
        }
    }

    /// Recorded guesses in submission order.
    pub fn entries(&self) -> &[GuessEntry] {
        &self.entries
    }

    /// Guess waiting on the verifier.
    pub fn in_flight(&self) -> Option<&InFlightGuess> {
        self.in_flight.as_ref()
    }

    /// Whether a verification is outstanding.
    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Wrong regular-round guesses, skips included.
    pub fn wrong_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.is_correct && !entry.is_final_five_guess)
            .count()
    }

    /// Wrong guesses still allowed in the regular round.
    pub fn remaining(&self) -> usize {
        self.max_wrong.saturating_sub(self.wrong_count())
    }

    /// Whether the wrong-guess budget is used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Accept a submission.
    ///
    /// Skips (outside the bonus round) are recorded right away and bypass duplicate detection.
    /// Anything else is normalized and parked as the in-flight guess until
    /// [`GuessLedger::resolve`] or [`GuessLedger::abandon`]. Regular guesses must differ from
    /// every earlier guess; the bonus round pick may repeat one, since the offered options
    /// can include earlier wrong answers.
    pub fn begin(
        &mut self,
        raw: &str,
        final_five: bool,
        now: OffsetDateTime,
    ) -> Result<Submission, Rejection> {
        if self.in_flight.is_some() {
            return Err(Rejection::GuessInFlight);
        }

        let text = raw.trim();
        if text == SKIPPED_GUESS && !final_five {
            let entry = GuessEntry {
                text: SKIPPED_GUESS.to_owned(),
                normalized_text: SKIPPED_GUESS.to_owned(),
                is_correct: false,
                is_final_five_guess: false,
                submitted_at: now,
            };
            self.entries.push(entry.clone());
            return Ok(Submission::Skipped(entry));
        }

        let normalized_text = normalize_guess(text);
        if normalized_text.is_empty() {
            return Err(Rejection::EmptyGuess);
        }

        if !final_five
            && self
                .entries
                .iter()
                .any(|entry| !entry.is_skip() && entry.normalized_text == normalized_text)
        {
            return Err(Rejection::DuplicateGuess(text.to_owned()));
        }

        let in_flight = InFlightGuess {
            id: Uuid::new_v4(),
            text: text.to_owned(),
            normalized_text,
            is_final_five_guess: final_five,
            submitted_at: now,
        };
        self.in_flight = Some(in_flight.clone());
        Ok(Submission::Verifying(in_flight))
    }

    /// Record the verdict for the in-flight guess `id`.
    pub fn resolve(&mut self, id: GuessId, is_correct: bool) -> Result<GuessEntry, Rejection> {
        let in_flight = self.take_in_flight(id)?;
        let entry = GuessEntry {
            text: in_flight.text,
            normalized_text: in_flight.normalized_text,
            is_correct,
            is_final_five_guess: in_flight.is_final_five_guess,
            submitted_at: in_flight.submitted_at,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Drop the in-flight guess `id` without recording it.
    pub fn abandon(&mut self, id: GuessId) -> Result<InFlightGuess, Rejection> {
        self.take_in_flight(id)
    }

    /// Drop whatever guess is in flight.
    pub fn abandon_any(&mut self) -> Option<InFlightGuess> {
        self.in_flight.take()
    }

    fn take_in_flight(&mut self, id: GuessId) -> Result<InFlightGuess, Rejection> {
        let in_flight = self.in_flight.take().ok_or(Rejection::NoGuessInFlight)?;

        if in_flight.id != id {
            let expected = in_flight.id;
            self.in_flight = Some(in_flight);
            return Err(Rejection::GuessTicketMismatch { expected, got: id });
        }

        Ok(in_flight)
    }
}

impl From<GuessEntity> for GuessEntry {
    fn from(value: GuessEntity) -> Self {
        Self {
            text: value.text,
            normalized_text: value.normalized_text,
            is_correct: value.is_correct,
            is_final_five_guess: value.is_final_five_guess,
            submitted_at: value.submitted_at,
        }
    }
}

impl From<GuessEntry> for GuessEntity {
    fn from(value: GuessEntry) -> Self {
        Self {
            text: value.text,
            normalized_text: value.normalized_text,
            is_correct: value.is_correct,
            is_final_five_guess: value.is_final_five_guess,
            submitted_at: value.submitted_at,
        }
    }
}
