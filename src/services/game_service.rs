//! Commands driving a session and the effect executor behind them.
//!
//! Every producer (player commands, the ticker, reveal commits, collaborator responses) ends up
//! in [`dispatch`]: reduce under the session lock, write the snapshot through, release the lock,
//! then execute the returned effects. All functions that may spawn work must be called from
//! within a Tokio runtime.

use tracing::{debug, info, warn};

use crate::{
    dto::{notice::SessionNotice, view::SessionView},
    error::Rejection,
    services::{
        final_five_service, persistence::SaveStatus, reveal_service, timer_service,
        verification_service,
    },
    state::{
        RuntimeDeps, RuntimeState, SharedRuntime,
        events::{Effect, RevealTicket, SessionEvent},
        ledger::SKIPPED_GUESS,
    },
};

/// Build a runtime and resume the stored session when there is one.
pub fn open_session(deps: RuntimeDeps) -> SharedRuntime {
    let runtime = RuntimeState::new(deps);

    match runtime.gateway().load() {
        Some(entity) => {
            if let Err(err) = dispatch(&runtime, SessionEvent::Rehydrated(Box::new(entity))) {
                warn!(error = %err, "stored session could not be rehydrated; starting fresh");
                if runtime.gateway().clear() == SaveStatus::Degraded {
                    runtime.notices().broadcast(SessionNotice::StorageDegraded);
                }
                persist_current(&runtime);
            }
        }
        None => persist_current(&runtime),
    }

    runtime.with_session(|session| {
        info!(
            session_id = %session.id(),
            challenge_id = %session.challenge().id,
            storage_key = runtime.gateway().key(),
            phase = ?session.phase(),
            degraded = runtime.is_degraded(),
            "session opened"
        );
    });
    runtime
}

/// Reduce `event`, persist the result and execute the resulting effects.
///
/// Returns the executed effects so callers can inspect what was scheduled.
pub fn dispatch(runtime: &SharedRuntime, event: SessionEvent) -> Result<Vec<Effect>, Rejection> {
    let now = runtime.now();
    let (effects, status, violations) = {
        let mut session = runtime.lock_session();
        let effects = session.dispatch(event, now).inspect_err(|err| {
            debug!(session_id = %session.id(), error = %err, "event rejected");
        })?;
        let status = runtime.gateway().save(&session, now);
        (effects, status, session.invariant_violations())
    };

    if !violations.is_empty() {
        warn!(?violations, "session invariants do not hold after dispatch");
    }
    if status == SaveStatus::Degraded {
        runtime.notices().broadcast(SessionNotice::StorageDegraded);
    }

    run_effects(runtime, &effects);
    Ok(effects)
}

fn run_effects(runtime: &SharedRuntime, effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::StartTicker | Effect::StopTicker => timer_service::sync_ticker(runtime),
            Effect::ScheduleRevealCommit(ticket) => reveal_service::schedule_commit(runtime, *ticket),
            Effect::VerifyGuess(request) => {
                verification_service::spawn_verification(runtime, request.clone())
            }
            Effect::FetchFinalFiveOptions(request) => {
                final_five_service::spawn_fetch(runtime, request.clone())
            }
            Effect::Notify(notice) => runtime.notices().broadcast(notice.clone()),
        }
    }
}

fn persist_current(runtime: &SharedRuntime) {
    let now = runtime.now();
    let status = {
        let session = runtime.lock_session();
        runtime.gateway().save(&session, now)
    };
    if status == SaveStatus::Degraded {
        runtime.notices().broadcast(SessionNotice::StorageDegraded);
    }
}

/// Start revealing `fact_index`; the commit fires after the configured delay.
pub fn start_reveal(runtime: &SharedRuntime, fact_index: usize) -> Result<RevealTicket, Rejection> {
    let effects = dispatch(runtime, SessionEvent::RevealStarted { fact_index })?;
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ScheduleRevealCommit(ticket) => Some(*ticket),
            _ => None,
        })
        .ok_or(Rejection::NoPendingReveal)
}

/// Submit a guess; the verdict is applied once the verifier answers.
pub fn submit_guess(runtime: &SharedRuntime, text: &str) -> Result<(), Rejection> {
    dispatch(
        runtime,
        SessionEvent::GuessSubmitted {
            text: text.to_owned(),
        },
    )
    .map(|_| ())
}

/// Give up on the current clue; counts as a wrong guess.
pub fn skip_clue(runtime: &SharedRuntime) -> Result<(), Rejection> {
    submit_guess(runtime, SKIPPED_GUESS)
}

/// Fetch the Final Five options again after every attempt failed.
pub fn retry_final_five(runtime: &SharedRuntime) -> Result<(), Rejection> {
    dispatch(runtime, SessionEvent::FinalFiveRetryRequested).map(|_| ())
}

/// Abandon the current session and start over on the same challenge.
///
/// Late callbacks of the abandoned session (reveal commits, verdicts, options) are refused by
/// ticket id when they arrive.
pub fn reset_session(runtime: &SharedRuntime, reason: &str) {
    let now = runtime.now();
    let (old_id, new_id, status) = {
        let mut session = runtime.lock_session();
        let old_id = session.id();
        *session = session.restarted();
        let status = runtime.gateway().save(&session, now);
        (old_id, session.id(), status)
    };

    info!(%old_id, %new_id, %reason, "session reset");
    runtime.reveal_slot().take();
    timer_service::sync_ticker(runtime);
    if status == SaveStatus::Degraded {
        runtime.notices().broadcast(SessionNotice::StorageDegraded);
    }
    runtime.notices().broadcast(SessionNotice::SessionReset {
        reason: reason.to_owned(),
    });
}

/// Snapshot of everything the UI renders.
pub fn session_view(runtime: &SharedRuntime) -> SessionView {
    let degraded = runtime.is_degraded();
    runtime.with_session(|session| SessionView::new(session, degraded))
}
