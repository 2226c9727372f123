//! Session aggregate and the reducer every [`SessionEvent`] goes through.
//!
//! [`GameSession::dispatch`] is the only way to mutate a session. Each event is reduced on a
//! staged copy that replaces the live session only when the whole event was accepted, so a
//! [`Rejection`] never leaves half-applied state behind. Side effects (timers, collaborator
//! calls, notices) are returned as [`Effect`]s for the runtime to execute.

use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::{GameConfig, StaleTimerPolicy},
    dao::models::{FinalFiveEntity, SESSION_SCHEMA_VERSION, SessionEntity},
    dto::notice::SessionNotice,
    error::Rejection,
    services::collaborators::validate_options,
    state::{
        clock::{Countdown, Resumed, TickOutcome, elapsed_secs},
        events::{Effect, FinalFiveRequest, RevealTicket, SessionEvent, VerifyRequest},
        ledger::{GuessEntry, GuessId, GuessLedger, Submission, normalize_guess},
        reveal::{FactSlot, PendingReveal, RevealId, RevealPipeline},
        state_machine::{
            FinalFivePhase, FinalFiveReason, GamePhase, GameStateMachine, Outcome, PhaseEvent,
        },
    },
};

/// Puzzle a session is played against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Opaque puzzle identifier, one per day.
    pub id: String,
    /// Language guesses are verified in.
    pub language: String,
}

impl Challenge {
    /// Describe a challenge.
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
        }
    }
}

/// Subset of [`GameConfig`] the reducer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    /// Fact slots per challenge.
    pub fact_count: usize,
    /// Main countdown budget.
    pub time_budget_secs: u32,
    /// Wrong regular guesses allowed.
    pub max_guesses: usize,
    /// Delay between reveal start and commit.
    pub reveal_commit_delay: Duration,
    /// Bonus round countdown budget.
    pub final_five_time_secs: u32,
    /// Policy for countdowns resumed after a long absence.
    pub stale_timer: StaleTimerPolicy,
}

impl From<&GameConfig> for GameRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            fact_count: config.fact_count,
            time_budget_secs: config.time_budget_secs,
            max_guesses: config.max_guesses,
            reveal_commit_delay: config.reveal_commit_delay,
            final_five_time_secs: config.final_five_time_secs,
            stale_timer: config.stale_timer,
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

/// Progress of the Final Five option fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FinalFiveFetch {
    /// A fetch is running.
    InProgress {
        /// Attempts that already failed in this fetch.
        failed_attempts: u32,
    },
    /// Options arrived.
    Ready,
    /// Every attempt failed; waiting for the player to retry.
    Unavailable,
}

/// Bonus round data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalFiveState {
    /// Why the round was entered.
    pub reason: FinalFiveReason,
    /// Offered options, empty until fetched.
    pub options: Vec<String>,
    /// Fetch progress.
    pub fetch: FinalFiveFetch,
}

/// One player's session for one challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    id: Uuid,
    challenge: Challenge,
    rules: GameRules,
    has_seen_clue: bool,
    can_make_guess: bool,
    reveals: RevealPipeline,
    ledger: GuessLedger,
    countdown: Countdown,
    machine: GameStateMachine,
    final_five: Option<FinalFiveState>,
}

impl GameSession {
    /// Fresh session: every slot hidden, full budget, nothing started.
    pub fn new(challenge: Challenge, rules: GameRules) -> Self {
        Self {
            id: Uuid::new_v4(),
            has_seen_clue: false,
            can_make_guess: false,
            reveals: RevealPipeline::new(rules.fact_count),
            ledger: GuessLedger::new(rules.max_guesses),
            countdown: Countdown::new(rules.time_budget_secs),
            machine: GameStateMachine::new(),
            final_five: None,
            challenge,
            rules,
        }
    }

    /// Fresh session for the same challenge and rules, with a new generation id.
    pub fn restarted(&self) -> Self {
        Self::new(self.challenge.clone(), self.rules.clone())
    }

    /// Generation marker; changes on every reset.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Challenge being played.
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Rules in force.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Whether a reveal was ever started (and not repaired away).
    pub fn has_seen_clue(&self) -> bool {
        self.has_seen_clue
    }

    /// Whether the player holds an unconsumed clue to guess against.
    pub fn can_make_guess(&self) -> bool {
        self.can_make_guess
    }

    /// Reveal bookkeeping.
    pub fn reveals(&self) -> &RevealPipeline {
        &self.reveals
    }

    /// Guess bookkeeping.
    pub fn ledger(&self) -> &GuessLedger {
        &self.ledger
    }

    /// Countdown of the current round.
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Phase controller.
    pub fn machine(&self) -> &GameStateMachine {
        &self.machine
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Bonus round data, once the round was entered.
    pub fn final_five(&self) -> Option<&FinalFiveState> {
        self.final_five.as_ref()
    }

    /// Whether a guess is waiting on the verifier.
    pub fn is_processing_guess(&self) -> bool {
        self.ledger.is_processing()
    }

    /// Outcome of a finished session.
    pub fn outcome(&self) -> Option<Outcome> {
        self.machine.outcome()
    }

    /// Whether [`SessionEvent::RevealStarted`] could currently be accepted for some slot.
    pub fn can_reveal(&self) -> bool {
        self.machine.allows_reveal()
            && self.reveals.pending().is_none()
            && self.reveals.slots().contains(&FactSlot::Hidden)
    }

    /// Whether [`SessionEvent::GuessSubmitted`] could currently be accepted.
    pub fn can_submit_guess(&self) -> bool {
        self.check_guess_allowed().is_ok()
    }

    /// Whether nothing happened in this session yet.
    pub fn is_pristine(&self) -> bool {
        self.machine.phase() == GamePhase::AwaitingFirstReveal
            && !self.has_seen_clue
            && self.reveals.revealed().is_empty()
            && self.reveals.pending().is_none()
            && self.ledger.entries().is_empty()
            && !self.ledger.is_processing()
            && !self.countdown.is_active()
            && self.countdown.remaining_secs() == self.rules.time_budget_secs
    }

    /// Reduce one event. On success the session moved and the effects must be executed; on
    /// rejection the session is unchanged.
    pub fn dispatch(
        &mut self,
        event: SessionEvent,
        now: OffsetDateTime,
    ) -> Result<Vec<Effect>, Rejection> {
        let mut staged = self.clone();
        let mut effects = Vec::new();
        staged.reduce(event, now, &mut effects)?;
        *self = staged;
        Ok(effects)
    }

    fn reduce(
        &mut self,
        event: SessionEvent,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        match event {
            SessionEvent::TickElapsed => self.on_tick(now, effects),
            SessionEvent::RevealStarted { fact_index } => {
                self.on_reveal_started(fact_index, now, effects)
            }
            SessionEvent::RevealCommitted { reveal_id } => {
                self.on_reveal_committed(reveal_id, now, effects)
            }
            SessionEvent::GuessSubmitted { text } => self.on_guess_submitted(&text, now, effects),
            SessionEvent::GuessResolved {
                guess_id,
                is_correct,
            } => self.on_guess_resolved(guess_id, is_correct, now, effects),
            SessionEvent::GuessFailed { guess_id, reason } => {
                self.on_guess_failed(guess_id, reason, effects)
            }
            SessionEvent::FinalFiveLoaded { options } => {
                self.on_final_five_loaded(options, now, effects)
            }
            SessionEvent::FinalFiveAttemptFailed {
                attempt,
                max_attempts,
            } => self.on_final_five_attempt_failed(attempt, max_attempts, effects),
            SessionEvent::FinalFiveUnavailable => self.on_final_five_unavailable(effects),
            SessionEvent::FinalFiveRetryRequested => self.on_final_five_retry(effects),
            SessionEvent::Rehydrated(entity) => self.on_rehydrated(*entity, now, effects),
        }
    }

    fn on_tick(&mut self, now: OffsetDateTime, effects: &mut Vec<Effect>) -> Result<(), Rejection> {
        match self.countdown.tick() {
            TickOutcome::Idle => Err(Rejection::TimerInactive),
            TickOutcome::Running(time_remaining) => {
                effects.push(Effect::Notify(SessionNotice::TimerTick { time_remaining }));
                Ok(())
            }
            TickOutcome::Expired => {
                effects.push(Effect::StopTicker);
                effects.push(Effect::Notify(SessionNotice::TimerTick { time_remaining: 0 }));
                self.expire_time(now, effects)
            }
        }
    }

    fn expire_time(
        &mut self,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        info!(session_id = %self.id, phase = ?self.machine.phase(), "countdown expired");
        self.transition(PhaseEvent::TimeExpired, now, effects)?;
        Ok(())
    }

    fn on_reveal_started(
        &mut self,
        fact_index: usize,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        if !self.machine.allows_reveal() {
            return Err(Rejection::RevealsClosed);
        }

        let pending = self.reveals.start(fact_index, now)?;
        self.has_seen_clue = true;
        self.can_make_guess = true;
        // Keyed off the countdown itself, never off `has_seen_clue`.
        if self.countdown.start(now) {
            info!(
                session_id = %self.id,
                time_remaining = self.countdown.remaining_secs(),
                "countdown started"
            );
            effects.push(Effect::StartTicker);
        }

        debug!(session_id = %self.id, fact_index, reveal_id = %pending.id, "reveal started");
        effects.push(Effect::Notify(SessionNotice::RevealStarted { fact_index }));
        effects.push(Effect::ScheduleRevealCommit(RevealTicket {
            id: pending.id,
            fact_index,
            commit_after: self.rules.reveal_commit_delay,
        }));
        Ok(())
    }

    fn on_reveal_committed(
        &mut self,
        reveal_id: RevealId,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        let fact_index = self.reveals.commit(reveal_id)?;
        info!(session_id = %self.id, fact_index, "reveal committed");
        effects.push(Effect::Notify(SessionNotice::RevealCommitted { fact_index }));

        if self.machine.phase() == GamePhase::AwaitingFirstReveal {
            self.transition(PhaseEvent::RevealCommitted, now, effects)?;
        }
        Ok(())
    }

    fn check_guess_allowed(&self) -> Result<(), Rejection> {
        if matches!(
            self.machine.phase(),
            GamePhase::GameOver(_) | GamePhase::FinalFive(FinalFivePhase::Loading(_))
        ) {
            return Err(Rejection::GuessingClosed);
        }
        if !self.has_seen_clue {
            return Err(Rejection::NoClueSeen);
        }
        if self.reveals.revealed().is_empty() {
            return Err(Rejection::NoCommittedFact);
        }
        if self.ledger.is_processing() {
            return Err(Rejection::GuessInFlight);
        }
        if !self.can_make_guess {
            return Err(Rejection::GuessNotAllowed);
        }
        if !self.machine.allows_guess() {
            return Err(Rejection::GuessingClosed);
        }
        Ok(())
    }

    fn check_final_five_option(&self, raw: &str) -> Result<(), Rejection> {
        let normalized = normalize_guess(raw);
        if normalized.is_empty() {
            // Reported as an empty guess by the ledger.
            return Ok(());
        }

        let offered = self.final_five.as_ref().is_some_and(|state| {
            state
                .options
                .iter()
                .any(|option| normalize_guess(option) == normalized)
        });
        if offered {
            Ok(())
        } else {
            Err(Rejection::NotAnOption(raw.trim().to_owned()))
        }
    }

    fn on_guess_submitted(
        &mut self,
        raw: &str,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        self.check_guess_allowed()?;
        let final_five = self.machine.is_final_five_guessing();
        if final_five {
            self.check_final_five_option(raw)?;
        }

        match self.ledger.begin(raw, final_five, now)? {
            Submission::Skipped(entry) => {
                info!(
                    session_id = %self.id,
                    guesses_remaining = self.ledger.remaining(),
                    "clue skipped"
                );
                self.record(entry, now, effects)
            }
            Submission::Verifying(in_flight) => {
                debug!(
                    session_id = %self.id,
                    guess_id = %in_flight.id,
                    final_five,
                    "guess sent for verification"
                );
                effects.push(Effect::VerifyGuess(VerifyRequest {
                    guess_id: in_flight.id,
                    challenge_id: self.challenge.id.clone(),
                    text: in_flight.text,
                    language: self.challenge.language.clone(),
                }));
                Ok(())
            }
        }
    }

    fn on_guess_resolved(
        &mut self,
        guess_id: GuessId,
        is_correct: bool,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        let entry = self.ledger.resolve(guess_id, is_correct)?;
        info!(
            session_id = %self.id,
            %guess_id,
            is_correct,
            final_five = entry.is_final_five_guess,
            "guess recorded"
        );
        self.record(entry, now, effects)
    }

    /// Apply the consequences of a newly appended ledger entry.
    fn record(
        &mut self,
        entry: GuessEntry,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        self.can_make_guess = false;
        effects.push(Effect::Notify(SessionNotice::GuessRecorded {
            text: entry.text.clone(),
            is_correct: entry.is_correct,
            guesses_remaining: self.ledger.remaining(),
        }));

        if entry.is_final_five_guess {
            self.transition(
                PhaseEvent::FinalFiveAnswered {
                    correct: entry.is_correct,
                },
                now,
                effects,
            )?;
        } else if entry.is_correct {
            self.transition(PhaseEvent::CorrectGuess, now, effects)?;
        } else if self.ledger.is_exhausted() {
            self.transition(PhaseEvent::GuessesExhausted, now, effects)?;
        }
        Ok(())
    }

    fn on_guess_failed(
        &mut self,
        guess_id: GuessId,
        reason: String,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        let abandoned = self.ledger.abandon(guess_id)?;
        warn!(
            session_id = %self.id,
            %guess_id,
            guess = %abandoned.text,
            %reason,
            "guess verification failed; player may resubmit"
        );
        effects.push(Effect::Notify(SessionNotice::GuessFailed { message: reason }));
        Ok(())
    }

    fn loading_state(&mut self) -> Result<&mut FinalFiveState, Rejection> {
        if !matches!(
            self.machine.phase(),
            GamePhase::FinalFive(FinalFivePhase::Loading(_))
        ) {
            return Err(Rejection::FinalFiveNotLoading);
        }
        self.final_five
            .as_mut()
            .ok_or(Rejection::FinalFiveNotLoading)
    }

    fn on_final_five_loaded(
        &mut self,
        options: Vec<String>,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        let state = self.loading_state()?;
        validate_options(&options)?;
        state.options = options;
        state.fetch = FinalFiveFetch::Ready;

        self.transition(PhaseEvent::OptionsReady, now, effects)?;
        Ok(())
    }

    fn on_final_five_attempt_failed(
        &mut self,
        attempt: u32,
        max_attempts: u32,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        let state = self.loading_state()?;
        state.fetch = FinalFiveFetch::InProgress {
            failed_attempts: attempt,
        };
        effects.push(Effect::Notify(SessionNotice::SlowConnection {
            attempt,
            max_attempts,
        }));
        Ok(())
    }

    fn on_final_five_unavailable(&mut self, effects: &mut Vec<Effect>) -> Result<(), Rejection> {
        let state = self.loading_state()?;
        state.fetch = FinalFiveFetch::Unavailable;
        warn!(session_id = %self.id, "Final Five options unavailable after retries");
        effects.push(Effect::Notify(SessionNotice::FinalFiveUnavailable));
        Ok(())
    }

    fn on_final_five_retry(&mut self, effects: &mut Vec<Effect>) -> Result<(), Rejection> {
        let state = self.loading_state()?;
        if state.fetch != FinalFiveFetch::Unavailable {
            return Err(Rejection::FinalFiveFetchRunning);
        }
        state.fetch = FinalFiveFetch::InProgress { failed_attempts: 0 };

        info!(session_id = %self.id, "retrying Final Five option fetch");
        effects.push(Effect::FetchFinalFiveOptions(self.final_five_request()));
        Ok(())
    }

    fn final_five_request(&self) -> FinalFiveRequest {
        FinalFiveRequest {
            challenge_id: self.challenge.id.clone(),
            previous_guesses: self
                .ledger
                .entries()
                .iter()
                .filter(|entry| !entry.is_skip())
                .map(|entry| entry.text.clone())
                .collect(),
            language: self.challenge.language.clone(),
        }
    }

    /// Apply a phase event and run the entry actions of the new phase.
    fn transition(
        &mut self,
        event: PhaseEvent,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<GamePhase, Rejection> {
        let from = self.machine.phase();
        let next = self.machine.apply(event)?;
        info!(session_id = %self.id, ?from, to = ?next, ?event, "phase transition");
        effects.push(Effect::Notify(self.phase_notice()));

        match next {
            GamePhase::AwaitingFirstReveal | GamePhase::Guessing => {}
            GamePhase::FinalFive(FinalFivePhase::Loading(reason)) => {
                self.stop_countdown(effects);
                self.can_make_guess = false;
                self.abandon_in_flight_guess();
                self.final_five = Some(FinalFiveState {
                    reason,
                    options: Vec::new(),
                    fetch: FinalFiveFetch::InProgress { failed_attempts: 0 },
                });
                effects.push(Effect::FetchFinalFiveOptions(self.final_five_request()));
            }
            GamePhase::FinalFive(FinalFivePhase::Guessing(_)) => {
                self.countdown.reset(self.rules.final_five_time_secs);
                if self.countdown.start(now) {
                    effects.push(Effect::StartTicker);
                }
                self.can_make_guess = true;
            }
            GamePhase::GameOver(_) => {
                self.stop_countdown(effects);
                self.can_make_guess = false;
                self.abandon_in_flight_guess();
            }
        }

        Ok(next)
    }

    fn stop_countdown(&mut self, effects: &mut Vec<Effect>) {
        if self.countdown.stop() {
            effects.push(Effect::StopTicker);
        }
    }

    fn abandon_in_flight_guess(&mut self) {
        if let Some(abandoned) = self.ledger.abandon_any() {
            info!(
                session_id = %self.id,
                guess_id = %abandoned.id,
                "abandoning guess still being verified; its verdict will be ignored"
            );
        }
    }

    fn phase_notice(&self) -> SessionNotice {
        SessionNotice::PhaseChanged {
            phase: (&self.machine.phase()).into(),
            reason: self.machine.final_five_reason(),
            outcome: self.machine.outcome(),
        }
    }

    /// Why a stored snapshot must be discarded in favour of this fresh session.
    fn discard_reason(&self, entity: &SessionEntity, now: OffsetDateTime) -> Option<String> {
        if entity.schema_version != SESSION_SCHEMA_VERSION {
            return Some(format!(
                "unsupported snapshot schema version {}",
                entity.schema_version
            ));
        }
        if entity.challenge_id != self.challenge.id {
            return Some(format!(
                "stored session belongs to challenge `{}`",
                entity.challenge_id
            ));
        }

        if let StaleTimerPolicy::ResetSession { max_absence_secs } = self.rules.stale_timer {
            let absence = entity
                .timer_started_at
                .filter(|_| entity.is_timer_active)
                .map(|started_at| elapsed_secs(started_at, now));
            if let Some(absence) = absence.filter(|absence| *absence > max_absence_secs) {
                return Some(format!("countdown left running for {absence}s"));
            }
        }

        None
    }

    fn on_rehydrated(
        &mut self,
        entity: SessionEntity,
        now: OffsetDateTime,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        if !self.is_pristine() {
            return Err(Rejection::AlreadyStarted);
        }

        if let Some(reason) = self.discard_reason(&entity, now) {
            info!(session_id = %self.id, %reason, "discarding stored session");
            effects.push(Effect::Notify(SessionNotice::SessionReset { reason }));
            return Ok(());
        }

        let stored_options = entity
            .final_five
            .as_ref()
            .map(|state| state.options.clone())
            .unwrap_or_default();
        let phase = match GamePhase::from(entity.phase) {
            GamePhase::FinalFive(FinalFivePhase::Guessing(reason))
                if validate_options(&stored_options).is_err() =>
            {
                warn!(
                    session_id = %entity.session_id,
                    options = stored_options.len(),
                    "stored Final Five options are unusable; fetching them again"
                );
                GamePhase::FinalFive(FinalFivePhase::Loading(reason))
            }
            phase => phase,
        };

        self.id = entity.session_id;
        self.has_seen_clue = entity.has_seen_clue;
        self.can_make_guess = entity.can_make_guess;
        self.reveals = RevealPipeline::restore(
            self.rules.fact_count,
            entity.revealed_facts,
            entity.pending_reveal.map(PendingReveal::from),
        );
        self.ledger = GuessLedger::restore(
            self.rules.max_guesses,
            entity.guesses.into_iter().map(GuessEntry::from).collect(),
        );
        self.machine = GameStateMachine::restore(phase);
        self.final_five = match phase {
            GamePhase::FinalFive(FinalFivePhase::Loading(reason)) => Some(FinalFiveState {
                reason,
                options: Vec::new(),
                fetch: FinalFiveFetch::InProgress { failed_attempts: 0 },
            }),
            GamePhase::FinalFive(FinalFivePhase::Guessing(reason)) => Some(FinalFiveState {
                reason,
                options: stored_options,
                fetch: FinalFiveFetch::Ready,
            }),
            GamePhase::GameOver(_) => entity.final_five.map(|FinalFiveEntity { reason, options }| {
                FinalFiveState {
                    reason,
                    options,
                    fetch: FinalFiveFetch::Ready,
                }
            }),
            GamePhase::AwaitingFirstReveal | GamePhase::Guessing => None,
        };

        let ticking = matches!(
            phase,
            GamePhase::AwaitingFirstReveal
                | GamePhase::Guessing
                | GamePhase::FinalFive(FinalFivePhase::Guessing(_))
        );
        let (countdown, resumed) = Countdown::resume_from_persisted(
            entity.time_remaining,
            entity.is_timer_active && ticking,
            entity.timer_started_at,
            entity.timer_started_with,
            now,
        );
        self.countdown = countdown;

        info!(
            session_id = %self.id,
            ?phase,
            revealed = self.reveals.revealed().len(),
            guesses = self.ledger.entries().len(),
            time_remaining = self.countdown.remaining_secs(),
            "session rehydrated"
        );
        effects.push(Effect::Notify(self.phase_notice()));
        if matches!(phase, GamePhase::FinalFive(FinalFivePhase::Loading(_))) {
            effects.push(Effect::FetchFinalFiveOptions(self.final_five_request()));
        }

        // A reveal interrupted by the reload is finished now instead of being lost.
        if let Some(fact_index) = self.reveals.commit_pending() {
            info!(session_id = %self.id, fact_index, "committing reveal interrupted by reload");
            effects.push(Effect::Notify(SessionNotice::RevealCommitted { fact_index }));
        }
        if self.machine.phase() == GamePhase::AwaitingFirstReveal
            && !self.reveals.revealed().is_empty()
        {
            self.transition(PhaseEvent::RevealCommitted, now, effects)?;
        }

        if self.has_seen_clue && self.reveals.revealed().is_empty() {
            warn!(
                session_id = %self.id,
                "stored session had a clue flag without any committed fact; clearing it"
            );
            self.has_seen_clue = false;
            self.can_make_guess = false;
            effects.push(Effect::Notify(SessionNotice::SessionRepaired {
                reason: "clue flag set without a committed fact".into(),
            }));
        }

        match resumed {
            Resumed::Stopped => {}
            Resumed::Running => effects.push(Effect::StartTicker),
            Resumed::Expired => {
                info!(session_id = %self.id, "countdown ran out while the player was away");
                self.expire_time(now, effects)?;
            }
        }

        Ok(())
    }

    /// Whitelisted snapshot of the session.
    pub fn to_entity(&self, saved_at: OffsetDateTime) -> SessionEntity {
        SessionEntity {
            schema_version: SESSION_SCHEMA_VERSION,
            session_id: self.id,
            challenge_id: self.challenge.id.clone(),
            language: self.challenge.language.clone(),
            has_seen_clue: self.has_seen_clue,
            can_make_guess: self.can_make_guess,
            revealed_facts: self.reveals.revealed().iter().copied().collect(),
            pending_reveal: self.reveals.pending().cloned().map(Into::into),
            guesses: self.ledger.entries().iter().cloned().map(Into::into).collect(),
            time_remaining: self.countdown.remaining_secs(),
            is_timer_active: self.countdown.is_active(),
            timer_started_at: self.countdown.started_at(),
            timer_started_with: self.countdown.started_with(),
            phase: self.machine.phase().into(),
            final_five: self.final_five.as_ref().map(|state| FinalFiveEntity {
                reason: state.reason,
                options: state.options.clone(),
            }),
            saved_at,
        }
    }

    /// Session invariants that currently do not hold; empty for a consistent session.
    pub fn invariant_violations(&self) -> Vec<&'static str> {
        let mut violations = Vec::new();

        if self.has_seen_clue
            && self.reveals.revealed().is_empty()
            && self.reveals.pending().is_none()
        {
            violations.push("clue seen without a committed or pending reveal");
        }
        let pending_slots = self
            .reveals
            .slots()
            .iter()
            .filter(|slot| **slot == FactSlot::Pending)
            .count();
        if pending_slots > 1 {
            violations.push("more than one reveal pending");
        }
        if self.countdown.is_active() && self.countdown.started_at().is_none() {
            violations.push("countdown running without a start instant");
        }
        if self.machine.is_final_five_active() && self.final_five.is_none() {
            violations.push("bonus round active without its state");
        }
        if self.machine.is_game_over() && self.countdown.is_active() {
            violations.push("countdown running after game over");
        }
        if self.reveals.revealed().is_empty() && !self.ledger.entries().is_empty() {
            violations.push("guesses recorded before any committed fact");
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::state::ledger::SKIPPED_GUESS;

    const T0: OffsetDateTime = datetime!(2026-03-01 09:00 UTC);

    fn rules() -> GameRules {
        GameRules {
            fact_count: 8,
            time_budget_secs: 100,
            max_guesses: 5,
            reveal_commit_delay: Duration::from_millis(950),
            final_five_time_secs: 55,
            stale_timer: StaleTimerPolicy::Expire,
        }
    }

    fn session_with(rules: GameRules) -> GameSession {
        GameSession::new(Challenge::new("2026-03-01", "en"), rules)
    }

    fn session() -> GameSession {
        session_with(rules())
    }

    fn five_options() -> Vec<String> {
        ["Ada Lovelace", "Grace Hopper", "Alan Turing", "Edsger Dijkstra", "Barbara Liskov"]
            .map(String::from)
            .into()
    }

    fn reveal_ticket(effects: &[Effect]) -> RevealTicket {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::ScheduleRevealCommit(ticket) => Some(*ticket),
                _ => None,
            })
            .expect("reveal commit scheduled")
    }

    fn verify_request(effects: &[Effect]) -> VerifyRequest {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::VerifyGuess(request) => Some(request.clone()),
                _ => None,
            })
            .expect("verification requested")
    }

    fn fetch_requested(effects: &[Effect]) -> bool {
        effects
            .iter()
            .any(|effect| matches!(effect, Effect::FetchFinalFiveOptions(_)))
    }

    fn start_reveal(session: &mut GameSession, fact_index: usize) -> RevealTicket {
        let effects = session
            .dispatch(SessionEvent::RevealStarted { fact_index }, T0)
            .unwrap();
        reveal_ticket(&effects)
    }

    fn reveal_and_commit(session: &mut GameSession, fact_index: usize) -> Vec<Effect> {
        let ticket = start_reveal(session, fact_index);
        session
            .dispatch(
                SessionEvent::RevealCommitted {
                    reveal_id: ticket.id,
                },
                T0,
            )
            .unwrap()
    }

    fn submit(session: &mut GameSession, text: &str) -> VerifyRequest {
        let effects = session
            .dispatch(SessionEvent::GuessSubmitted { text: text.into() }, T0)
            .unwrap();
        verify_request(&effects)
    }

    fn guess(session: &mut GameSession, text: &str, is_correct: bool) -> Vec<Effect> {
        let request = submit(session, text);
        session
            .dispatch(
                SessionEvent::GuessResolved {
                    guess_id: request.guess_id,
                    is_correct,
                },
                T0,
            )
            .unwrap()
    }

    fn exhaust_guesses(session: &mut GameSession) -> Vec<Effect> {
        let mut last = Vec::new();
        for index in 0..5 {
            reveal_and_commit(session, index);
            last = guess(session, &format!("wrong {index}"), false);
        }
        last
    }

    fn load_options(session: &mut GameSession) -> Vec<Effect> {
        session
            .dispatch(
                SessionEvent::FinalFiveLoaded {
                    options: five_options(),
                },
                T0,
            )
            .unwrap()
    }

    fn rehydrate(entity: SessionEntity, now: OffsetDateTime) -> (GameSession, Vec<Effect>) {
        let mut fresh = session();
        let effects = fresh
            .dispatch(SessionEvent::Rehydrated(Box::new(entity)), now)
            .unwrap();
        (fresh, effects)
    }

    #[test]
    fn reveal_start_sets_flags_and_starts_the_clock() {
        let mut session = session();
        let effects = session
            .dispatch(SessionEvent::RevealStarted { fact_index: 0 }, T0)
            .unwrap();

        assert!(session.has_seen_clue());
        assert!(session.can_make_guess());
        assert!(session.countdown().is_active());
        assert_eq!(effects[0], Effect::StartTicker);
        assert_eq!(
            reveal_ticket(&effects).commit_after,
            Duration::from_millis(950)
        );
        assert_eq!(session.phase(), GamePhase::AwaitingFirstReveal);
        assert!(session.invariant_violations().is_empty());
    }

    #[test]
    fn normal_win() {
        let mut session = session();
        let effects = reveal_and_commit(&mut session, 0);
        assert!(effects.contains(&Effect::Notify(SessionNotice::PhaseChanged {
            phase: crate::dto::phase::VisiblePhase::Guessing,
            reason: None,
            outcome: None,
        })));

        let effects = guess(&mut session, "Ada Lovelace", true);
        assert_eq!(session.phase(), GamePhase::GameOver(Outcome::Win));
        assert_eq!(session.outcome(), Some(Outcome::Win));
        assert!(!session.countdown().is_active());
        assert!(effects.contains(&Effect::StopTicker));
        assert!(!session.can_submit_guess());
    }

    #[test]
    fn guesses_need_a_committed_fact() {
        let mut session = session();
        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: "x".into() }, T0),
            Err(Rejection::NoClueSeen)
        );

        start_reveal(&mut session, 0);
        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: "x".into() }, T0),
            Err(Rejection::NoCommittedFact)
        );
        assert!(session.ledger().entries().is_empty());
    }

    #[test]
    fn rejections_leave_the_session_untouched() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        start_reveal(&mut session, 1);
        let before = session.clone();

        assert_eq!(
            session.dispatch(SessionEvent::RevealStarted { fact_index: 2 }, T0),
            Err(Rejection::RevealAlreadyPending(1))
        );
        assert!(matches!(
            session.dispatch(
                SessionEvent::RevealCommitted {
                    reveal_id: Uuid::new_v4()
                },
                T0
            ),
            Err(Rejection::RevealTicketMismatch { .. })
        ));
        assert_eq!(
            session.dispatch(SessionEvent::FinalFiveRetryRequested, T0),
            Err(Rejection::FinalFiveNotLoading)
        );
        assert_eq!(
            session.dispatch(SessionEvent::RevealStarted { fact_index: 8 }, T0),
            Err(Rejection::FactOutOfRange { index: 8, count: 8 })
        );

        assert_eq!(session, before);
    }

    #[test]
    fn one_guess_per_revealed_clue() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        guess(&mut session, "Paris", false);

        assert!(!session.can_make_guess());
        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: "Rome".into() }, T0),
            Err(Rejection::GuessNotAllowed)
        );

        reveal_and_commit(&mut session, 1);
        guess(&mut session, "Rome", false);
        assert_eq!(session.ledger().entries().len(), 2);
        assert_eq!(session.ledger().remaining(), 3);
    }

    #[test]
    fn duplicate_guess_appends_once() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        guess(&mut session, "Paris", false);
        reveal_and_commit(&mut session, 1);

        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: " paris ".into() }, T0),
            Err(Rejection::DuplicateGuess("paris".into()))
        );
        assert_eq!(session.ledger().entries().len(), 1);
        assert_eq!(session.ledger().remaining(), 4);
        assert!(session.can_make_guess());
    }

    #[test]
    fn second_submit_while_verifying_is_rejected() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        submit(&mut session, "Paris");

        assert!(session.is_processing_guess());
        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: "Rome".into() }, T0),
            Err(Rejection::GuessInFlight)
        );
    }

    #[test]
    fn repeated_skips_always_succeed() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        session
            .dispatch(SessionEvent::GuessSubmitted { text: SKIPPED_GUESS.into() }, T0)
            .unwrap();
        reveal_and_commit(&mut session, 1);
        let effects = session
            .dispatch(SessionEvent::GuessSubmitted { text: SKIPPED_GUESS.into() }, T0)
            .unwrap();

        assert!(!effects.iter().any(|e| matches!(e, Effect::VerifyGuess(_))));
        assert_eq!(session.ledger().entries().len(), 2);
        assert!(session.ledger().entries().iter().all(GuessEntry::is_skip));
        assert_eq!(session.ledger().remaining(), 3);
        assert!(!session.can_make_guess());
    }

    #[test]
    fn verifier_failure_allows_resubmission() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        let request = submit(&mut session, "Paris");

        let effects = session
            .dispatch(
                SessionEvent::GuessFailed {
                    guess_id: request.guess_id,
                    reason: "network unreachable".into(),
                },
                T0,
            )
            .unwrap();
        assert_eq!(
            effects,
            [Effect::Notify(SessionNotice::GuessFailed {
                message: "network unreachable".into()
            })]
        );
        assert!(!session.is_processing_guess());
        assert!(session.ledger().entries().is_empty());

        guess(&mut session, "Paris", false);
        assert_eq!(session.ledger().entries().len(), 1);
    }

    #[test]
    fn guess_budget_exhaustion_enters_final_five_on_guesses() {
        let mut session = session();
        let effects = exhaust_guesses(&mut session);

        assert_eq!(
            session.phase(),
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Guesses))
        );
        assert!(fetch_requested(&effects));
        assert!(effects.contains(&Effect::StopTicker));
        assert!(!session.countdown().is_active());
        assert!(!session.can_make_guess());
        assert!(!session.can_reveal());
        assert_eq!(
            session.final_five().map(|state| state.fetch),
            Some(FinalFiveFetch::InProgress { failed_attempts: 0 })
        );

        // The stopped countdown can no longer trigger the time path.
        assert_eq!(
            session.dispatch(SessionEvent::TickElapsed, T0),
            Err(Rejection::TimerInactive)
        );
        assert_eq!(
            session.machine().final_five_reason(),
            Some(FinalFiveReason::Guesses)
        );
    }

    #[test]
    fn final_five_request_lists_previous_guesses_without_skips() {
        let mut session = session();
        for index in 0..4 {
            reveal_and_commit(&mut session, index);
            guess(&mut session, &format!("wrong {index}"), false);
        }
        reveal_and_commit(&mut session, 4);
        let effects = session
            .dispatch(SessionEvent::GuessSubmitted { text: SKIPPED_GUESS.into() }, T0)
            .unwrap();

        let request = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::FetchFinalFiveOptions(request) => Some(request.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            request.previous_guesses,
            ["wrong 0", "wrong 1", "wrong 2", "wrong 3"]
        );
        assert_eq!(request.challenge_id, "2026-03-01");
    }

    #[test]
    fn time_expiry_abandons_the_guess_in_flight() {
        let mut session = session_with(GameRules {
            time_budget_secs: 3,
            ..rules()
        });
        reveal_and_commit(&mut session, 0);
        let request = submit(&mut session, "Paris");

        session.dispatch(SessionEvent::TickElapsed, T0).unwrap();
        session.dispatch(SessionEvent::TickElapsed, T0).unwrap();
        let effects = session.dispatch(SessionEvent::TickElapsed, T0).unwrap();

        assert_eq!(
            session.phase(),
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Time))
        );
        assert!(effects.contains(&Effect::StopTicker));
        assert!(fetch_requested(&effects));
        assert!(!session.is_processing_guess());

        // The verdict arrives after the round changed.
        assert_eq!(
            session.dispatch(
                SessionEvent::GuessResolved {
                    guess_id: request.guess_id,
                    is_correct: true,
                },
                T0
            ),
            Err(Rejection::NoGuessInFlight)
        );
        assert!(session.ledger().entries().is_empty());
    }

    #[test]
    fn final_five_round_win() {
        let mut session = session();
        exhaust_guesses(&mut session);

        let effects = load_options(&mut session);
        assert_eq!(
            session.phase(),
            GamePhase::FinalFive(FinalFivePhase::Guessing(FinalFiveReason::Guesses))
        );
        assert!(effects.contains(&Effect::StartTicker));
        assert_eq!(session.countdown().remaining_secs(), 55);
        assert!(session.can_submit_guess());

        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: "Linus".into() }, T0),
            Err(Rejection::NotAnOption("Linus".into()))
        );
        assert_eq!(
            session.dispatch(SessionEvent::GuessSubmitted { text: SKIPPED_GUESS.into() }, T0),
            Err(Rejection::NotAnOption(SKIPPED_GUESS.into()))
        );

        let effects = guess(&mut session, "grace hopper", true);
        assert_eq!(session.outcome(), Some(Outcome::FinalFiveWin));
        assert!(effects.contains(&Effect::StopTicker));
        assert!(session.ledger().entries().last().unwrap().is_final_five_guess);
        assert!(session.invariant_violations().is_empty());
    }

    #[test]
    fn wrong_final_five_pick_loses() {
        let mut session = session();
        exhaust_guesses(&mut session);
        load_options(&mut session);

        guess(&mut session, "Alan Turing", false);
        assert_eq!(session.outcome(), Some(Outcome::LossFinalFiveWrong));
    }

    #[test]
    fn final_five_option_matching_an_earlier_wrong_guess_can_be_picked() {
        let mut session = session();
        for (index, text) in ["Grace Hopper", "wrong 1", "wrong 2", "wrong 3", "wrong 4"]
            .into_iter()
            .enumerate()
        {
            reveal_and_commit(&mut session, index);
            guess(&mut session, text, false);
        }
        load_options(&mut session);

        let request = submit(&mut session, "Grace Hopper");
        assert_eq!(request.text, "Grace Hopper");
        session
            .dispatch(
                SessionEvent::GuessResolved {
                    guess_id: request.guess_id,
                    is_correct: true,
                },
                T0,
            )
            .unwrap();
        assert_eq!(session.outcome(), Some(Outcome::FinalFiveWin));
        assert_eq!(session.ledger().entries().len(), 6);
    }

    #[test]
    fn final_five_timeout_maps_to_the_entry_reason() {
        let mut session = session_with(GameRules {
            final_five_time_secs: 2,
            ..rules()
        });
        exhaust_guesses(&mut session);
        load_options(&mut session);

        session.dispatch(SessionEvent::TickElapsed, T0).unwrap();
        session.dispatch(SessionEvent::TickElapsed, T0).unwrap();
        assert_eq!(session.outcome(), Some(Outcome::LossGuesses));
        assert!(!session.countdown().is_active());
    }

    #[test]
    fn malformed_options_are_refused() {
        let mut session = session();
        exhaust_guesses(&mut session);

        assert_eq!(
            session.dispatch(
                SessionEvent::FinalFiveLoaded {
                    options: five_options()[..3].to_vec()
                },
                T0
            ),
            Err(Rejection::MalformedOptions {
                expected: 5,
                got: 3
            })
        );
        assert!(session.machine().is_final_five_active());
        assert!(!session.machine().is_final_five_guessing());
    }

    #[test]
    fn unavailable_options_can_be_retried() {
        let mut session = session();
        exhaust_guesses(&mut session);

        let effects = session
            .dispatch(
                SessionEvent::FinalFiveAttemptFailed {
                    attempt: 1,
                    max_attempts: 3,
                },
                T0,
            )
            .unwrap();
        assert_eq!(
            effects,
            [Effect::Notify(SessionNotice::SlowConnection {
                attempt: 1,
                max_attempts: 3
            })]
        );
        assert_eq!(
            session.dispatch(SessionEvent::FinalFiveRetryRequested, T0),
            Err(Rejection::FinalFiveFetchRunning)
        );

        session
            .dispatch(SessionEvent::FinalFiveUnavailable, T0)
            .unwrap();
        assert_eq!(
            session.final_five().map(|state| state.fetch),
            Some(FinalFiveFetch::Unavailable)
        );

        let effects = session
            .dispatch(SessionEvent::FinalFiveRetryRequested, T0)
            .unwrap();
        assert!(fetch_requested(&effects));
        load_options(&mut session);
        assert!(session.machine().is_final_five_guessing());
    }

    #[test]
    fn pending_reveal_still_commits_after_game_over() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        let request = submit(&mut session, "Ada");
        let ticket = start_reveal(&mut session, 1);
        session
            .dispatch(
                SessionEvent::GuessResolved {
                    guess_id: request.guess_id,
                    is_correct: true,
                },
                T0,
            )
            .unwrap();
        assert!(session.machine().is_game_over());

        session
            .dispatch(
                SessionEvent::RevealCommitted {
                    reveal_id: ticket.id,
                },
                T0,
            )
            .unwrap();
        assert_eq!(
            session.reveals().revealed().iter().copied().collect::<Vec<_>>(),
            [0, 1]
        );
        assert_eq!(session.outcome(), Some(Outcome::Win));
        assert_eq!(
            session.dispatch(SessionEvent::RevealStarted { fact_index: 2 }, T0),
            Err(Rejection::RevealsClosed)
        );
    }

    #[test]
    fn reload_during_pending_reveal_keeps_the_fact() {
        let mut session = session();
        start_reveal(&mut session, 0);
        let stored = session.to_entity(T0);
        assert_eq!(stored.pending_reveal.as_ref().map(|p| p.fact_index), Some(0));

        let (restored, effects) = rehydrate(stored, T0 + time::Duration::seconds(2));

        assert!(restored.has_seen_clue());
        assert_eq!(
            restored.reveals().revealed().iter().copied().collect::<Vec<_>>(),
            [0]
        );
        assert!(restored.reveals().pending().is_none());
        assert_eq!(restored.phase(), GamePhase::Guessing);
        assert!(restored.countdown().is_active());
        assert_eq!(restored.countdown().remaining_secs(), 98);
        assert!(effects.contains(&Effect::StartTicker));
        assert!(effects.contains(&Effect::Notify(SessionNotice::RevealCommitted {
            fact_index: 0
        })));
        assert!(restored.can_submit_guess());
        assert!(restored.invariant_violations().is_empty());
    }

    #[test]
    fn legacy_snapshot_without_committed_fact_is_repaired() {
        let mut stored = session().to_entity(T0);
        stored.has_seen_clue = true;
        stored.can_make_guess = true;
        stored.is_timer_active = true;
        stored.timer_started_at = Some(T0);
        assert!(stored.revealed_facts.is_empty());

        let (restored, effects) = rehydrate(stored, T0 + time::Duration::seconds(10));

        assert!(!restored.has_seen_clue());
        assert!(!restored.can_make_guess());
        assert!(restored.can_reveal());
        assert!(restored.countdown().is_active());
        assert_eq!(restored.countdown().remaining_secs(), 90);
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::Notify(SessionNotice::SessionRepaired { .. })
        )));
        assert!(restored.invariant_violations().is_empty());
    }

    #[test]
    fn rehydration_resumes_the_countdown_minus_time_away() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        let stored = session.to_entity(T0);

        let (restored, _) = rehydrate(stored, T0 + time::Duration::seconds(30));
        assert_eq!(restored.countdown().remaining_secs(), 70);
    }

    #[test]
    fn countdown_that_ran_out_while_away_expires_on_load() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        let stored = session.to_entity(T0);

        let (restored, effects) = rehydrate(stored, T0 + time::Duration::days(3));
        assert_eq!(
            restored.phase(),
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Time))
        );
        assert_eq!(restored.countdown().remaining_secs(), 0);
        assert!(fetch_requested(&effects));
        assert!(!effects.contains(&Effect::StartTicker));
    }

    #[test]
    fn reset_policy_discards_stale_sessions() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        let stored = session.to_entity(T0);

        let mut fresh = session_with(GameRules {
            stale_timer: StaleTimerPolicy::ResetSession {
                max_absence_secs: 3_600,
            },
            ..rules()
        });
        let before = fresh.clone();
        let effects = fresh
            .dispatch(
                SessionEvent::Rehydrated(Box::new(stored)),
                T0 + time::Duration::days(2),
            )
            .unwrap();

        assert_eq!(fresh, before);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(SessionNotice::SessionReset { .. })]
        ));
    }

    #[test]
    fn snapshot_of_another_challenge_is_ignored() {
        let mut stored = session().to_entity(T0);
        stored.challenge_id = "2026-02-28".into();
        stored.revealed_facts = vec![1];

        let (restored, effects) = rehydrate(stored, T0);
        assert!(restored.is_pristine());
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(SessionNotice::SessionReset { .. })]
        ));
    }

    #[test]
    fn rehydration_only_applies_to_a_fresh_session() {
        let stored = session().to_entity(T0);
        let mut session = session();
        start_reveal(&mut session, 0);

        assert_eq!(
            session.dispatch(SessionEvent::Rehydrated(Box::new(stored)), T0),
            Err(Rejection::AlreadyStarted)
        );
    }

    #[test]
    fn rehydration_restores_the_persisted_phase_and_history() {
        let mut session = session();
        reveal_and_commit(&mut session, 3);
        guess(&mut session, "Paris", false);
        reveal_and_commit(&mut session, 5);
        let stored = session.to_entity(T0);

        let (restored, _) = rehydrate(stored, T0);
        assert_eq!(restored.id(), session.id());
        assert_eq!(restored.phase(), GamePhase::Guessing);
        assert_eq!(
            restored.reveals().revealed().iter().copied().collect::<Vec<_>>(),
            [3, 5]
        );
        assert_eq!(restored.ledger().entries(), session.ledger().entries());
        assert!(restored.can_submit_guess());
    }

    #[test]
    fn rehydration_mid_transition_fetches_the_options_again() {
        let mut session = session();
        exhaust_guesses(&mut session);
        let stored = session.to_entity(T0);

        let (restored, effects) = rehydrate(stored, T0);
        assert_eq!(
            restored.phase(),
            GamePhase::FinalFive(FinalFivePhase::Loading(FinalFiveReason::Guesses))
        );
        assert!(fetch_requested(&effects));
        assert!(!restored.countdown().is_active());
    }

    #[test]
    fn finished_session_stays_finished_after_reload() {
        let mut session = session();
        reveal_and_commit(&mut session, 0);
        guess(&mut session, "Ada", true);
        let stored = session.to_entity(T0);

        let (restored, effects) = rehydrate(stored, T0 + time::Duration::hours(1));
        assert_eq!(restored.outcome(), Some(Outcome::Win));
        assert!(!effects.contains(&Effect::StartTicker));
        assert!(!restored.can_reveal());
    }
}
