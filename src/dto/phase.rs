use serde::Serialize;

use crate::state::state_machine::{FinalFivePhase, GamePhase};

/// Publicly visible session phase exposed to the UI.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Nothing committed yet.
    AwaitingFirstReveal,
    /// Regular round.
    Guessing,
    /// Bonus round options are loading.
    FinalFiveTransition,
    /// Bonus round options are on screen.
    FinalFiveGuessing,
    /// Session finished.
    GameOver,
}

impl From<&GamePhase> for VisiblePhase {
    fn from(value: &GamePhase) -> Self {
        match value {
            GamePhase::AwaitingFirstReveal => VisiblePhase::AwaitingFirstReveal,
            GamePhase::Guessing => VisiblePhase::Guessing,
            GamePhase::FinalFive(FinalFivePhase::Loading(_)) => VisiblePhase::FinalFiveTransition,
            GamePhase::FinalFive(FinalFivePhase::Guessing(_)) => VisiblePhase::FinalFiveGuessing,
            GamePhase::GameOver(_) => VisiblePhase::GameOver,
        }
    }
}
