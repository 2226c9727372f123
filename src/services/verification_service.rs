use tracing::{debug, warn};

use crate::{
    services::game_service,
    state::{SharedRuntime, events::SessionEvent, events::VerifyRequest},
};

/// Send a guess to the verifier once and feed the answer back into the session.
///
/// Never retried: a second call could double count the guess. Answers for a guess the session
/// no longer waits on are dropped by the reducer.
pub fn spawn_verification(runtime: &SharedRuntime, request: VerifyRequest) {
    let runtime = runtime.clone();
    let call = runtime
        .verifier()
        .verify_guess(&request.challenge_id, &request.text, &request.language);

    tokio::spawn(async move {
        let event = match call.await {
            Ok(verdict) => SessionEvent::GuessResolved {
                guess_id: request.guess_id,
                is_correct: verdict.is_correct,
            },
            Err(err) => {
                warn!(guess_id = %request.guess_id, error = %err, "guess verification failed");
                SessionEvent::GuessFailed {
                    guess_id: request.guess_id,
                    reason: err.to_string(),
                }
            }
        };

        if let Err(err) = game_service::dispatch(&runtime, event) {
            debug!(guess_id = %request.guess_id, error = %err, "late verification result ignored");
        }
    });
}
