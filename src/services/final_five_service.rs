use tracing::{debug, info, warn};

use crate::{
    error::CollaboratorError,
    services::{collaborators::validate_options, game_service, retry::retry_with_policy},
    state::{SharedRuntime, events::FinalFiveRequest, events::SessionEvent},
};

/// Fetch the Final Five options with the configured backoff.
///
/// Each failed attempt that will be retried is reported as a slow connection; when every
/// attempt failed the round is marked unavailable until the player asks for a retry.
pub fn spawn_fetch(runtime: &SharedRuntime, request: FinalFiveRequest) {
    let runtime = runtime.clone();

    tokio::spawn(async move {
        let policy = runtime.config().final_five_retry.clone();
        let max_attempts = policy.max_attempts;

        let result = retry_with_policy(
            &policy,
            |attempt, err: &CollaboratorError| {
                warn!(attempt, max_attempts, error = %err, "Final Five fetch attempt failed; retrying");
                let event = SessionEvent::FinalFiveAttemptFailed {
                    attempt,
                    max_attempts,
                };
                if let Err(err) = game_service::dispatch(&runtime, event) {
                    debug!(error = %err, "slow connection notice refused");
                }
            },
            || {
                let call = runtime.final_five_source().fetch_final_five_options(
                    &request.challenge_id,
                    &request.previous_guesses,
                    &request.language,
                );
                async move {
                    let options = call.await?;
                    validate_options(&options)
                        .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
                    Ok::<_, CollaboratorError>(options)
                }
            },
        )
        .await;

        let event = match result {
            Ok(options) => {
                info!(challenge_id = %request.challenge_id, "Final Five options fetched");
                SessionEvent::FinalFiveLoaded { options }
            }
            Err(err) => {
                warn!(attempts = max_attempts, error = %err, "giving up on Final Five options");
                SessionEvent::FinalFiveUnavailable
            }
        };

        if let Err(err) = game_service::dispatch(&runtime, event) {
            debug!(error = %err, "Final Five fetch result ignored");
        }
    });
}
