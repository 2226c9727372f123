pub mod clock;
pub mod events;
pub mod ledger;
mod notify;
pub mod reveal;
pub mod session;
pub mod state_machine;

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{
    config::GameConfig,
    dao::kv_store::KeyValueStore,
    services::{
        collaborators::{AnswerVerifier, FinalFiveSource},
        persistence::PersistenceGateway,
        time_source::TimeSource,
    },
    state::{
        events::RevealTicket,
        session::{Challenge, GameRules, GameSession},
    },
};

pub use self::notify::NoticeHub;

/// Shared handle on a running session.
pub type SharedRuntime = Arc<RuntimeState>;

/// Capacity of the notice broadcast channel.
const NOTICE_CAPACITY: usize = 64;

/// Everything a runtime is built from.
pub struct RuntimeDeps {
    /// Session configuration.
    pub config: GameConfig,
    /// Puzzle of the day.
    pub challenge: Challenge,
    /// Durable snapshot storage.
    pub store: Arc<dyn KeyValueStore>,
    /// Guess verification collaborator.
    pub verifier: Arc<dyn AnswerVerifier>,
    /// Final Five option collaborator.
    pub final_five: Arc<dyn FinalFiveSource>,
    /// Wall clock.
    pub clock: Arc<dyn TimeSource>,
}

/// Running one-second interval and its generation id.
pub(crate) struct TickerHandle {
    pub(crate) id: Uuid,
    pub(crate) handle: JoinHandle<()>,
}

/// Scheduled reveal commit that any number of callers may await.
pub(crate) struct ScheduledReveal {
    pub(crate) ticket: RevealTicket,
    pub(crate) done: Shared<BoxFuture<'static, ()>>,
}

/// Central runtime state: the session, its persistence and the handles of its background tasks.
pub struct RuntimeState {
    session: Mutex<GameSession>,
    gateway: PersistenceGateway,
    verifier: Arc<dyn AnswerVerifier>,
    final_five: Arc<dyn FinalFiveSource>,
    clock: Arc<dyn TimeSource>,
    config: GameConfig,
    notices: NoticeHub,
    ticker: Mutex<Option<TickerHandle>>,
    reveal: Mutex<Option<ScheduledReveal>>,
}

impl RuntimeState {
    /// Build a runtime around a fresh session, wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Nothing is loaded from storage here; see [`crate::services::game_service::open_session`].
    pub fn new(deps: RuntimeDeps) -> SharedRuntime {
        let RuntimeDeps {
            config,
            challenge,
            store,
            verifier,
            final_five,
            clock,
        } = deps;

        let session = GameSession::new(challenge, GameRules::from(&config));
        Arc::new(Self {
            session: Mutex::new(session),
            gateway: PersistenceGateway::new(store, config.storage_key.clone()),
            verifier,
            final_five,
            clock,
            config,
            notices: NoticeHub::new(NOTICE_CAPACITY),
            ticker: Mutex::new(None),
            reveal: Mutex::new(None),
        })
    }

    /// Lock the session. A poisoned lock is recovered: the reducer never leaves partial state.
    pub(crate) fn lock_session(&self) -> MutexGuard<'_, GameSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the current session.
    pub fn with_session<T>(&self, f: impl FnOnce(&GameSession) -> T) -> T {
        f(&self.lock_session())
    }

    /// Persistence gateway of the session.
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        self.gateway.is_degraded()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.gateway.degraded_watcher()
    }

    /// Broadcast hub used for UI notices.
    pub fn notices(&self) -> &NoticeHub {
        &self.notices
    }

    /// Answer verification collaborator.
    pub fn verifier(&self) -> &Arc<dyn AnswerVerifier> {
        &self.verifier
    }

    /// Final Five option collaborator.
    pub fn final_five_source(&self) -> &Arc<dyn FinalFiveSource> {
        &self.final_five
    }

    /// Configuration the runtime was built with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current wall-clock time.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub(crate) fn ticker_slot(&self) -> MutexGuard<'_, Option<TickerHandle>> {
        self.ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn reveal_slot(&self) -> MutexGuard<'_, Option<ScheduledReveal>> {
        self.reveal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether `id` identifies the interval currently driving the countdown.
    pub(crate) fn is_current_ticker(&self, id: Uuid) -> bool {
        self.ticker_slot()
            .as_ref()
            .is_some_and(|ticker| ticker.id == id)
    }
}
