use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::state_machine::{FinalFiveReason, Outcome};

/// Version written into every snapshot; bump when the layout changes incompatibly.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Whitelisted session snapshot written through to the key-value store.
///
/// `is_processing_guess` is deliberately absent: an in-flight verification does not survive a
/// reload and the player simply resubmits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Layout version, see [`SESSION_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Generation marker of the persisted session.
    pub session_id: Uuid,
    /// Puzzle the session belongs to.
    pub challenge_id: String,
    /// Language the guesses are verified in.
    pub language: String,
    /// Whether a reveal was ever started.
    pub has_seen_clue: bool,
    /// Whether a guess could be submitted when the snapshot was taken.
    pub can_make_guess: bool,
    /// Committed fact indices in reveal order.
    pub revealed_facts: Vec<usize>,
    /// Reveal started but not committed yet.
    #[serde(default)]
    pub pending_reveal: Option<PendingRevealEntity>,
    /// Recorded guesses in submission order.
    #[serde(default)]
    pub guesses: Vec<GuessEntity>,
    /// Seconds left on the countdown at snapshot time.
    pub time_remaining: u32,
    /// Whether the countdown was running.
    pub is_timer_active: bool,
    /// Anchor instant of the running countdown.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timer_started_at: Option<OffsetDateTime>,
    /// Remaining seconds at `timer_started_at`.
    #[serde(default)]
    pub timer_started_with: Option<u32>,
    /// Persisted phase tag; restored as-is, never re-derived.
    pub phase: PhaseEntity,
    /// Bonus round data, present once the round was entered.
    #[serde(default)]
    pub final_five: Option<FinalFiveEntity>,
    /// Time the snapshot was written.
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

/// Reveal that was started but whose commit had not fired yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingRevealEntity {
    /// Reveal ticket.
    pub id: Uuid,
    /// Slot being revealed.
    pub fact_index: usize,
    /// When the reveal started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// Single recorded guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuessEntity {
    /// Text as typed (trimmed).
    pub text: String,
    /// Lower-cased text used for duplicate detection.
    pub normalized_text: String,
    /// Verifier verdict.
    pub is_correct: bool,
    /// Whether the guess was the Final Five pick.
    pub is_final_five_guess: bool,
    /// Submission time.
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// Phase tag stored in the snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PhaseEntity {
    /// No fact committed yet.
    AwaitingFirstReveal,
    /// Regular round.
    Guessing,
    /// Bonus round entered, options not fetched yet.
    FinalFiveTransition {
        /// Why the round was entered.
        reason: FinalFiveReason,
    },
    /// Bonus round options on screen.
    FinalFiveGuessing {
        /// Why the round was entered.
        reason: FinalFiveReason,
    },
    /// Finished session.
    GameOver {
        /// Final outcome.
        outcome: Outcome,
    },
}

/// Bonus round data stored in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalFiveEntity {
    /// Why the round was entered.
    pub reason: FinalFiveReason,
    /// Options offered to the player, empty until fetched.
    #[serde(default)]
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn snapshot_uses_camel_case_and_kebab_case_tags() {
        let entity = SessionEntity {
            schema_version: SESSION_SCHEMA_VERSION,
            session_id: Uuid::nil(),
            challenge_id: "2026-03-01".into(),
            language: "en".into(),
            has_seen_clue: true,
            can_make_guess: false,
            revealed_facts: vec![2],
            pending_reveal: None,
            guesses: vec![],
            time_remaining: 80,
            is_timer_active: false,
            timer_started_at: None,
            timer_started_with: None,
            phase: PhaseEntity::GameOver {
                outcome: Outcome::FinalFiveWin,
            },
            final_five: Some(FinalFiveEntity {
                reason: FinalFiveReason::Guesses,
                options: vec!["a".into()],
            }),
            saved_at: datetime!(2026-03-01 10:00 UTC),
        };

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["hasSeenClue"], json!(true));
        assert_eq!(value["revealedFacts"], json!([2]));
        assert_eq!(
            value["phase"],
            json!({"state": "gameOver", "outcome": "final-five-win"})
        );
        assert_eq!(value["finalFive"]["reason"], json!("guesses"));
        assert_eq!(value["savedAt"], json!("2026-03-01T10:00:00Z"));
    }

    #[test]
    fn older_snapshots_without_pending_reveal_still_decode() {
        let raw = json!({
            "schemaVersion": 1,
            "sessionId": Uuid::nil(),
            "challengeId": "c-1",
            "language": "en",
            "hasSeenClue": true,
            "canMakeGuess": true,
            "revealedFacts": [],
            "timeRemaining": 300,
            "isTimerActive": true,
            "timerStartedAt": "2026-03-01T09:00:00Z",
            "phase": {"state": "awaitingFirstReveal"},
            "savedAt": "2026-03-01T09:00:00Z"
        });

        let entity: SessionEntity = serde_json::from_value(raw).unwrap();
        assert!(entity.pending_reveal.is_none());
        assert!(entity.guesses.is_empty());
        assert_eq!(entity.timer_started_with, None);
        assert_eq!(entity.timer_started_at, Some(datetime!(2026-03-01 09:00 UTC)));
    }
}
