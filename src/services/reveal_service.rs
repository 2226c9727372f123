use futures::FutureExt;
use tokio::time::sleep;
use tracing::debug;

use crate::{
    services::game_service,
    state::{ScheduledReveal, SharedRuntime, events::RevealTicket, events::SessionEvent},
};

/// Schedule the commit of a started reveal. The commit cannot be cancelled; if the session
/// moved on in the meantime the reducer refuses the stale ticket.
pub fn schedule_commit(runtime: &SharedRuntime, ticket: RevealTicket) {
    let task_runtime = runtime.clone();
    let handle = tokio::spawn(async move {
        sleep(ticket.commit_after).await;
        let event = SessionEvent::RevealCommitted {
            reveal_id: ticket.id,
        };
        if let Err(err) = game_service::dispatch(&task_runtime, event) {
            debug!(
                reveal_id = %ticket.id,
                fact_index = ticket.fact_index,
                error = %err,
                "scheduled reveal commit refused"
            );
        }
    });

    let done = async move {
        let _ = handle.await;
    }
    .boxed()
    .shared();
    *runtime.reveal_slot() = Some(ScheduledReveal { ticket, done });
}

/// Ticket of the reveal waiting on its commit, if any.
pub fn pending_reveal(runtime: &SharedRuntime) -> Option<RevealTicket> {
    let pending_id = runtime.with_session(|session| session.reveals().pending().map(|p| p.id))?;
    runtime
        .reveal_slot()
        .as_ref()
        .map(|scheduled| scheduled.ticket)
        .filter(|ticket| ticket.id == pending_id)
}

/// Wait until the scheduled commit of the last started reveal ran. Returns immediately when
/// nothing is scheduled.
pub async fn wait_for_reveal(runtime: &SharedRuntime) {
    let done = runtime
        .reveal_slot()
        .as_ref()
        .map(|scheduled| scheduled.done.clone());
    if let Some(done) = done {
        done.await;
    }
}
