//! Traits for the external services the session talks to.

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::{CollaboratorError, Rejection};

/// Number of options offered in the bonus round.
pub const FINAL_FIVE_OPTION_COUNT: usize = 5;

/// Verifier answer for a single guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether the guess matches the hidden answer.
    pub is_correct: bool,
}

/// Checks a guess against the hidden answer.
///
/// Called at most once per submission; failures are surfaced to the player, never retried.
pub trait AnswerVerifier: Send + Sync {
    /// Verify `guess` for `challenge_id` in `language`.
    fn verify_guess(
        &self,
        challenge_id: &str,
        guess: &str,
        language: &str,
    ) -> BoxFuture<'static, Result<Verdict, CollaboratorError>>;
}

/// Produces the shuffled multiple-choice options of the bonus round.
pub trait FinalFiveSource: Send + Sync {
    /// Fetch the options for `challenge_id`; `previous_guesses` lets the source pick distractors.
    fn fetch_final_five_options(
        &self,
        challenge_id: &str,
        previous_guesses: &[String],
        language: &str,
    ) -> BoxFuture<'static, Result<Vec<String>, CollaboratorError>>;
}

/// Check the option count returned by a [`FinalFiveSource`].
pub fn validate_options(options: &[String]) -> Result<(), Rejection> {
    if options.len() != FINAL_FIVE_OPTION_COUNT {
        return Err(Rejection::MalformedOptions {
            expected: FINAL_FIVE_OPTION_COUNT,
            got: options.len(),
        });
    }
    Ok(())
}
