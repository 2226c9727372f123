use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::{format_timestamp, phase::VisiblePhase},
    state::{
        reveal::FactSlot,
        session::{FinalFiveFetch, GameSession},
        state_machine::{FinalFiveReason, Outcome},
    },
};

/// Everything the UI needs to render a session and enable its controls.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Generation marker of the session.
    pub session_id: Uuid,
    /// Puzzle being played.
    pub challenge_id: String,
    /// Coarse phase.
    pub phase: VisiblePhase,
    /// Phase transitions applied since the session was created or restored.
    pub phase_version: usize,
    /// Every slot in index order.
    pub facts: Vec<FactSlot>,
    /// Committed slots in reveal order.
    pub revealed_facts: Vec<usize>,
    /// Slot whose reveal animation is running.
    pub pending_reveal: Option<usize>,
    /// Recorded guesses.
    pub guesses: Vec<GuessView>,
    /// Wrong regular guesses still allowed.
    pub guesses_remaining: usize,
    /// Whether a reveal was ever started.
    pub has_seen_clue: bool,
    /// Whether an unconsumed clue is available.
    pub can_make_guess: bool,
    /// Whether a guess waits on the verifier.
    pub is_processing_guess: bool,
    /// Whether a fact can be dropped on the stack right now.
    pub can_reveal: bool,
    /// Whether the guess input is enabled.
    pub can_submit_guess: bool,
    /// Seconds left on the countdown.
    pub time_remaining: u32,
    /// Whether the countdown runs.
    pub is_timer_active: bool,
    /// Whether the bonus round is in progress.
    pub is_final_five_active: bool,
    /// Bonus round data once the round was entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_five: Option<FinalFiveView>,
    /// Whether the session is finished.
    pub is_game_over: bool,
    /// Outcome of a finished session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Whether progress is only kept in memory.
    pub storage_degraded: bool,
}

/// Recorded guess as shown in the history.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuessView {
    /// Text as submitted.
    pub text: String,
    /// Verdict.
    pub is_correct: bool,
    /// Whether the entry is a skipped clue.
    pub is_skip: bool,
    /// Whether it was the bonus round pick.
    pub is_final_five_guess: bool,
    /// RFC 3339 submission time.
    pub submitted_at: String,
}

/// Bonus round as shown to the player.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalFiveView {
    /// Why the round was entered.
    pub reason: FinalFiveReason,
    /// Options, empty while loading.
    pub options: Vec<String>,
    /// Fetch progress.
    pub fetch: FinalFiveFetch,
}

impl SessionView {
    /// Render `session`.
    pub fn new(session: &GameSession, storage_degraded: bool) -> Self {
        let machine = session.machine();
        let snapshot = machine.snapshot();
        Self {
            session_id: session.id(),
            challenge_id: session.challenge().id.clone(),
            phase: VisiblePhase::from(&snapshot.phase),
            phase_version: snapshot.version,
            facts: session.reveals().slots().to_vec(),
            revealed_facts: session.reveals().revealed().iter().copied().collect(),
            pending_reveal: session.reveals().pending().map(|pending| pending.fact_index),
            guesses: session
                .ledger()
                .entries()
                .iter()
                .map(|entry| GuessView {
                    text: entry.text.clone(),
                    is_correct: entry.is_correct,
                    is_skip: entry.is_skip(),
                    is_final_five_guess: entry.is_final_five_guess,
                    submitted_at: format_timestamp(entry.submitted_at),
                })
                .collect(),
            guesses_remaining: session.ledger().remaining(),
            has_seen_clue: session.has_seen_clue(),
            can_make_guess: session.can_make_guess(),
            is_processing_guess: session.is_processing_guess(),
            can_reveal: session.can_reveal(),
            can_submit_guess: session.can_submit_guess(),
            time_remaining: session.countdown().remaining_secs(),
            is_timer_active: session.countdown().is_active(),
            is_final_five_active: machine.is_final_five_active(),
            final_five: session.final_five().map(|state| FinalFiveView {
                reason: state.reason,
                options: state.options.clone(),
                fetch: state.fetch,
            }),
            is_game_over: machine.is_game_over(),
            outcome: machine.outcome(),
            storage_degraded,
        }
    }
}
