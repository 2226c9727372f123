use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::Rejection,
    services::game_service,
    state::{RuntimeState, SharedRuntime, TickerHandle, events::SessionEvent},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Make the one-second interval follow the countdown: running iff the countdown is active.
///
/// Idempotent, so start/stop effects executed out of order by concurrent producers still
/// converge on the right state.
pub fn sync_ticker(runtime: &SharedRuntime) {
    let session = runtime.lock_session();
    let mut slot = runtime.ticker_slot();

    match (session.countdown().is_active(), slot.is_some()) {
        (true, false) => {
            let id = Uuid::new_v4();
            debug!(ticker_id = %id, "starting ticker");
            *slot = Some(TickerHandle {
                id,
                handle: tokio::spawn(run_ticker(Arc::downgrade(runtime), id)),
            });
        }
        (false, true) => {
            if let Some(ticker) = slot.take() {
                debug!(ticker_id = %ticker.id, "stopping ticker");
                ticker.handle.abort();
            }
        }
        _ => {}
    }
}

/// Whether an interval is currently driving the countdown.
pub fn is_ticking(runtime: &SharedRuntime) -> bool {
    runtime.ticker_slot().is_some()
}

async fn run_ticker(weak: Weak<RuntimeState>, id: Uuid) {
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(runtime) = weak.upgrade() else {
            break;
        };
        if !runtime.is_current_ticker(id) {
            break;
        }

        match game_service::dispatch(&runtime, SessionEvent::TickElapsed) {
            Ok(_) => {}
            Err(Rejection::TimerInactive) => {
                info!(ticker_id = %id, "countdown stopped; ticker exiting");
                break;
            }
            Err(err) => {
                debug!(ticker_id = %id, error = %err, "tick rejected; ticker exiting");
                break;
            }
        }
    }

    if let Some(runtime) = weak.upgrade() {
        let mut slot = runtime.ticker_slot();
        if slot.as_ref().is_some_and(|ticker| ticker.id == id) {
            slot.take();
        }
    }
}
