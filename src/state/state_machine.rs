use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dao::models::PhaseEntity;

/// High-level phases a trivia session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Fresh session: nothing has been committed yet.
    AwaitingFirstReveal,
    /// At least one fact is on the table and regular guesses are accepted.
    Guessing,
    /// Bonus round triggered by running out of time or guesses.
    FinalFive(FinalFivePhase),
    /// Terminal phase carrying the session outcome.
    GameOver(Outcome),
}

/// Fine-grained phase of the Final Five bonus round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalFivePhase {
    /// Options are being fetched; nothing can be played yet.
    Loading(FinalFiveReason),
    /// Options are on screen and the single bonus guess is open.
    Guessing(FinalFiveReason),
}

/// Indicates why the session fell into the Final Five round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalFiveReason {
    /// The main countdown reached zero.
    Time,
    /// The wrong-guess budget was exhausted.
    Guesses,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Correct answer during the regular round.
    Win,
    /// Correct answer picked among the Final Five options.
    FinalFiveWin,
    /// Bonus round entered on time and left unanswered.
    LossTime,
    /// Bonus round entered on guesses and left unanswered.
    LossGuesses,
    /// Wrong Final Five option picked.
    LossFinalFiveWrong,
}

/// Events that can be applied to the phase controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A reveal was committed to the session.
    RevealCommitted,
    /// The running countdown reached zero.
    TimeExpired,
    /// The last allowed wrong guess was recorded.
    GuessesExhausted,
    /// The verifier accepted a regular guess.
    CorrectGuess,
    /// Final Five options were fetched successfully.
    OptionsReady,
    /// The single Final Five guess was resolved.
    FinalFiveAnswered {
        /// Whether the picked option was the answer.
        correct: bool,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the controller was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Snapshot of the current controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: GamePhase,
    /// Number of transitions applied since the controller was created or restored.
    pub version: usize,
}

/// Phase controller gating reveals, guesses and the bonus round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::AwaitingFirstReveal,
            version: 0,
        }
    }
}

impl GameStateMachine {
    /// Create a controller waiting for the first reveal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a controller from a persisted phase tag.
    pub fn restore(phase: GamePhase) -> Self {
        Self { phase, version: 0 }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Create a snapshot of the current controller state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Whether a new reveal may start.
    pub fn allows_reveal(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::AwaitingFirstReveal | GamePhase::Guessing
        )
    }

    /// Whether a guess may be submitted.
    pub fn allows_guess(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::Guessing | GamePhase::FinalFive(FinalFivePhase::Guessing(_))
        )
    }

    /// Whether the bonus round is in progress (loading or guessing).
    pub fn is_final_five_active(&self) -> bool {
        matches!(self.phase, GamePhase::FinalFive(_))
    }

    /// Whether the single Final Five guess is open.
    pub fn is_final_five_guessing(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::FinalFive(FinalFivePhase::Guessing(_))
        )
    }

    /// Whether the session is over.
    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver(_))
    }

    /// Outcome of a finished session.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            GamePhase::GameOver(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Reason the bonus round was entered, while it is active.
    pub fn final_five_reason(&self) -> Option<FinalFiveReason> {
        match self.phase {
            GamePhase::FinalFive(
                FinalFivePhase::Loading(reason) | FinalFivePhase::Guessing(reason),
            ) => Some(reason),
            _ => None,
        }
    }

    /// Apply an event, moving the controller to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, event: PhaseEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: PhaseEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::AwaitingFirstReveal, PhaseEvent::RevealCommitted) => GamePhase::Guessing,
            (
                GamePhase::AwaitingFirstReveal | GamePhase::Guessing,
                PhaseEvent::TimeExpired,
            ) => GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Time)),
            (GamePhase::Guessing, PhaseEvent::GuessesExhausted) => {
                GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Guesses))
            }
            (GamePhase::Guessing, PhaseEvent::CorrectGuess) => GamePhase::GameOver(Outcome::Win),
            (
                GamePhase::FinalFive(FinalFivePhase::Loading(reason)),
                PhaseEvent::OptionsReady,
            ) => GamePhase::FinalFive(FinalFivePhase::Guessing(reason)),
            (
                GamePhase::FinalFive(FinalFivePhase::Guessing(_)),
                PhaseEvent::FinalFiveAnswered { correct },
            ) => {
                if correct {
                    GamePhase::GameOver(Outcome::FinalFiveWin)
                } else {
                    GamePhase::GameOver(Outcome::LossFinalFiveWrong)
                }
            }
            (
                GamePhase::FinalFive(FinalFivePhase::Guessing(reason)),
                PhaseEvent::TimeExpired,
            ) => match reason {
                FinalFiveReason::Time => GamePhase::GameOver(Outcome::LossTime),
                FinalFiveReason::Guesses => GamePhase::GameOver(Outcome::LossGuesses),
            },
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

impl From<GamePhase> for PhaseEntity {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::AwaitingFirstReveal => PhaseEntity::AwaitingFirstReveal,
            GamePhase::Guessing => PhaseEntity::Guessing,
            GamePhase::FinalFive(FinalFivePhase::Loading(reason)) => {
                PhaseEntity::FinalFiveTransition { reason }
            }
            GamePhase::FinalFive(FinalFivePhase::Guessing(reason)) => {
                PhaseEntity::FinalFiveGuessing { reason }
            }
            GamePhase::GameOver(outcome) => PhaseEntity::GameOver { outcome },
        }
    }
}

impl From<PhaseEntity> for GamePhase {
    fn from(value: PhaseEntity) -> Self {
        match value {
            PhaseEntity::AwaitingFirstReveal => GamePhase::AwaitingFirstReveal,
            PhaseEntity::Guessing => GamePhase::Guessing,
            PhaseEntity::FinalFiveTransition { reason } => {
                GamePhase::FinalFive(FinalFivePhase::Loading(reason))
            }
            PhaseEntity::FinalFiveGuessing { reason } => {
                GamePhase::FinalFive(FinalFivePhase::Guessing(reason))
            }
            PhaseEntity::GameOver { outcome } => GamePhase::GameOver(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: PhaseEvent) -> GamePhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_awaits_first_reveal() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::AwaitingFirstReveal);
        assert!(sm.allows_reveal());
        assert!(!sm.allows_guess());
    }

    #[test]
    fn regular_win_path() {
        let mut sm = GameStateMachine::new();
        assert_eq!(
            apply(&mut sm, PhaseEvent::RevealCommitted),
            GamePhase::Guessing
        );
        assert_eq!(
            apply(&mut sm, PhaseEvent::CorrectGuess),
            GamePhase::GameOver(Outcome::Win)
        );
        assert_eq!(sm.snapshot().version, 2);
        assert_eq!(sm.outcome(), Some(Outcome::Win));
    }

    #[test]
    fn final_five_path_after_guesses() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, PhaseEvent::RevealCommitted);

        assert_eq!(
            apply(&mut sm, PhaseEvent::GuessesExhausted),
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Guesses))
        );
        assert!(sm.is_final_five_active());
        assert!(!sm.allows_guess());
        assert!(!sm.allows_reveal());

        assert_eq!(
            apply(&mut sm, PhaseEvent::OptionsReady),
            GamePhase::FinalFive(FinalFivePhase::Guessing(FinalFiveReason::Guesses))
        );
        assert!(sm.allows_guess());
        assert_eq!(
            apply(&mut sm, PhaseEvent::FinalFiveAnswered { correct: true }),
            GamePhase::GameOver(Outcome::FinalFiveWin)
        );
        assert!(!sm.is_final_five_active());
    }

    #[test]
    fn first_final_five_trigger_wins() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, PhaseEvent::RevealCommitted);
        apply(&mut sm, PhaseEvent::TimeExpired);

        let err = sm.apply(PhaseEvent::GuessesExhausted).unwrap_err();
        assert_eq!(
            err.from,
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Time))
        );
        assert_eq!(sm.final_five_reason(), Some(FinalFiveReason::Time));
    }

    #[test]
    fn final_five_timeout_maps_to_entry_reason() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, PhaseEvent::RevealCommitted);
        apply(&mut sm, PhaseEvent::GuessesExhausted);
        apply(&mut sm, PhaseEvent::OptionsReady);
        assert_eq!(
            apply(&mut sm, PhaseEvent::TimeExpired),
            GamePhase::GameOver(Outcome::LossGuesses)
        );

        let mut sm = GameStateMachine::new();
        apply(&mut sm, PhaseEvent::TimeExpired);
        apply(&mut sm, PhaseEvent::OptionsReady);
        assert_eq!(
            apply(&mut sm, PhaseEvent::FinalFiveAnswered { correct: false }),
            GamePhase::GameOver(Outcome::LossFinalFiveWrong)
        );
    }

    #[test]
    fn game_over_is_terminal() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, PhaseEvent::RevealCommitted);
        apply(&mut sm, PhaseEvent::CorrectGuess);

        for event in [
            PhaseEvent::RevealCommitted,
            PhaseEvent::TimeExpired,
            PhaseEvent::GuessesExhausted,
            PhaseEvent::CorrectGuess,
            PhaseEvent::OptionsReady,
            PhaseEvent::FinalFiveAnswered { correct: true },
        ] {
            assert!(sm.apply(event).is_err(), "{event:?} escaped game over");
        }
        assert_eq!(sm.phase(), GamePhase::GameOver(Outcome::Win));
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = GameStateMachine::new();
        let err = sm.apply(PhaseEvent::CorrectGuess).unwrap_err();
        assert_eq!(err.from, GamePhase::AwaitingFirstReveal);
        assert_eq!(err.event, PhaseEvent::CorrectGuess);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn persisted_tag_maps_back_to_the_same_phase() {
        let phase = GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Time));
        let entity = PhaseEntity::from(phase);
        assert_eq!(
            entity,
            PhaseEntity::FinalFiveTransition {
                reason: FinalFiveReason::Time
            }
        );
        assert_eq!(GamePhase::from(entity), phase);
    }
}
