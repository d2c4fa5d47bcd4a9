//! Session controller.
//!
//! Owns the parameters, the word wheel, the metrics and the tick scheduler.
//! All mutable state sits behind one mutex; ticks, completions and the public
//! operations each take it once, so a tick's buffer step and a completion's
//! target swap never interleave.
//!
//! Lock order is scheduler before state whenever both are held.
//!
//! Every schedule carries the epoch current when it was started. Stopping or
//! replacing a schedule bumps the epoch, so a timer callback already past its
//! last `.await` when it was aborted finds a newer epoch and does nothing.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use generation_provider::{validate_dispatch_body, GenerationProvider, ProviderProfile, RunId};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::core::params::{ParamError, ParamUpdate, SessionParams, EMPTY_RESPONSE_PLACEHOLDER};
use crate::core::tokenizer::tokenize;
use crate::core::wheel::WordWheel;
use crate::runtime::generation::{
    lock_unpoisoned, GenerationClient, GenerationOutcome, GenerationReport, RequestState,
};
use crate::runtime::scheduler::TickScheduler;
use crate::runtime::snapshot::SessionSnapshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session must be started from within a tokio runtime")]
    NoRuntime,
    #[error("cannot reset while the session is running")]
    ResetWhileRunning,
    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
}

/// Result of a parameter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Refused because the key cannot change while running; the prior value stays.
    Locked,
}

#[derive(Debug, Default)]
struct Metrics {
    cycle_count: u64,
    last_latency: Option<Duration>,
    last_tokens: Option<u64>,
    last_error: Option<String>,
    last_model: Option<String>,
}

struct SessionState {
    params: SessionParams,
    wheel: WordWheel,
    running: bool,
    in_flight: Option<RunId>,
    request_state: RequestState,
    metrics: Metrics,
    runtime: Option<Handle>,
    schedule_epoch: u64,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            display_text: self.wheel.display_text(),
            target_text: self.wheel.target_text(),
            running: self.running,
            cycle_count: self.metrics.cycle_count,
            last_latency_ms: self
                .metrics
                .last_latency
                .map(|latency| u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
            last_tokens: self.metrics.last_tokens,
            last_error: self.metrics.last_error.clone(),
            last_model: self.metrics.last_model.clone(),
            request_state: self.request_state,
            parameters: self.params.clone(),
        }
    }

    fn retire_schedule(&mut self) {
        self.schedule_epoch = self.schedule_epoch.wrapping_add(1);
    }

    fn reseed(&mut self) {
        self.wheel.reset(self.params.effective_seed());
        self.metrics = Metrics::default();
        self.request_state = RequestState::Idle;
    }
}

struct Shared {
    scheduler: Mutex<TickScheduler>,
    state: Mutex<SessionState>,
    client: Arc<GenerationClient>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl Shared {
    fn publish(&self, state: &SessionState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn tick(self: &Arc<Self>) {
        let mut state = lock_unpoisoned(&self.state);
        self.tick_locked(&mut state);
    }

    fn scheduled_tick(self: &Arc<Self>, epoch: u64) {
        let mut state = lock_unpoisoned(&self.state);
        if state.schedule_epoch != epoch {
            tracing::trace!(epoch, current = state.schedule_epoch, "ignoring retired tick");
            return;
        }
        self.tick_locked(&mut state);
    }

    fn tick_locked(self: &Arc<Self>, state: &mut SessionState) {
        if !state.running {
            return;
        }

        state.wheel.step(state.params.words_per_tick);

        if state.in_flight.is_none() {
            if let Some(runtime) = state.runtime.clone() {
                self.dispatch(state, &runtime);
            }
        }

        self.publish(state);
    }

    fn dispatch(self: &Arc<Self>, state: &mut SessionState, runtime: &Handle) {
        let params = match validate_dispatch_body(&state.params.dispatch_body()) {
            Ok(params) => params,
            Err(error) => {
                tracing::warn!(%error, "generation request rejected before dispatch");
                state.metrics.last_error = Some(error.to_string());
                state.request_state = RequestState::Failed;
                return;
            }
        };

        let (run_id, report) = self.client.dispatch(params);
        state.in_flight = Some(run_id);
        state.request_state = RequestState::InFlight { run_id };
        state.metrics.last_error = None;
        tracing::debug!(run_id, model = %state.params.model, "dispatched generation");

        let shared = Arc::downgrade(self);
        runtime.spawn(async move {
            let report = report.await;
            if let Some(shared) = shared.upgrade() {
                shared.apply_report(report);
            }
        });
    }

    fn apply_report(&self, report: GenerationReport) {
        let mut state = lock_unpoisoned(&self.state);
        if state.in_flight != Some(report.run_id) {
            tracing::debug!(
                run_id = report.run_id,
                current = ?state.in_flight,
                "discarding stale generation result"
            );
            return;
        }
        state.in_flight = None;

        match report.outcome {
            GenerationOutcome::Completed {
                content,
                model,
                usage,
            } => {
                let text = if content.is_empty() {
                    EMPTY_RESPONSE_PLACEHOLDER
                } else {
                    content.as_str()
                };
                state.wheel.set_target(tokenize(text));
                state.metrics.cycle_count += 1;
                state.metrics.last_latency = report.latency;
                state.metrics.last_tokens = usage.and_then(|usage| usage.total_tokens);
                state.metrics.last_model = Some(model);
                state.request_state = RequestState::Completed;
                tracing::info!(
                    run_id = report.run_id,
                    cycle = state.metrics.cycle_count,
                    latency = ?report.latency,
                    "generation completed"
                );
            }
            GenerationOutcome::Failed { error } => {
                tracing::warn!(run_id = report.run_id, %error, "generation failed");
                state.metrics.last_latency = report.latency;
                state.metrics.last_error = Some(error);
                state.request_state = RequestState::Failed;
            }
            GenerationOutcome::Cancelled => {
                state.request_state = RequestState::Aborted;
            }
        }

        self.publish(&state);
    }

    fn start_scheduler(self: &Arc<Self>, scheduler: &mut TickScheduler, runtime: &Handle) {
        let (interval, epoch) = {
            let state = lock_unpoisoned(&self.state);
            (state.params.interval(), state.schedule_epoch)
        };
        let shared: Weak<Self> = Arc::downgrade(self);
        scheduler.start(runtime, interval, move || {
            if let Some(shared) = shared.upgrade() {
                shared.scheduled_tick(epoch);
            }
        });
    }
}

/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(provider: Arc<dyn GenerationProvider>, params: SessionParams) -> Self {
        let params = params.normalized();
        let state = SessionState {
            wheel: WordWheel::new(params.effective_seed()),
            params,
            running: false,
            in_flight: None,
            request_state: RequestState::Idle,
            metrics: Metrics::default(),
            runtime: None,
            schedule_epoch: 0,
        };
        let (snapshots, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                scheduler: Mutex::new(TickScheduler::new()),
                state: Mutex::new(state),
                client: GenerationClient::new(provider),
                snapshots,
            }),
        }
    }

    /// Re-seeds the buffers, clears metrics, ticks once and starts the schedule.
    ///
    /// Calling it while running restarts the session; any pending generation is
    /// cancelled and its result discarded.
    pub fn start(&self) -> Result<(), SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let mut scheduler = lock_unpoisoned(&self.shared.scheduler);
        scheduler.stop();

        {
            let mut state = lock_unpoisoned(&self.shared.state);
            if let Some(run_id) = state.in_flight.take() {
                self.shared.client.cancel_active();
                tracing::debug!(run_id, "cancelled generation on restart");
            }
            state.retire_schedule();
            state.reseed();
            state.running = true;
            state.runtime = Some(runtime.clone());
            tracing::info!(
                interval_ms = state.params.interval_ms,
                words_per_tick = state.params.words_per_tick,
                model = %state.params.model,
                "session started"
            );
        }

        self.shared.tick();
        self.shared.start_scheduler(&mut scheduler, &runtime);
        Ok(())
    }

    /// Halts ticking and cancels the pending generation. Safe to call twice.
    pub fn stop(&self) {
        let mut scheduler = lock_unpoisoned(&self.shared.scheduler);
        scheduler.stop();

        let mut state = lock_unpoisoned(&self.shared.state);
        state.retire_schedule();
        if !state.running && state.in_flight.is_none() {
            return;
        }

        state.running = false;
        if state.in_flight.take().is_some() {
            self.shared.client.cancel_active();
            state.request_state = RequestState::Aborted;
        }
        tracing::info!(cycle = state.metrics.cycle_count, "session stopped");
        self.shared.publish(&state);
    }

    /// Replaces the seed and rebuilds the buffers from it.
    pub fn reset(&self, seed: impl Into<String>) -> Result<(), SessionError> {
        let mut state = lock_unpoisoned(&self.shared.state);
        if state.running {
            return Err(SessionError::ResetWhileRunning);
        }

        state.params.seed_text = seed.into();
        state.reseed();
        tracing::info!("session reset to seed");
        self.shared.publish(&state);
        Ok(())
    }

    /// Parses and applies one keyed parameter.
    pub fn update_parameter(&self, key: &str, value: &str) -> Result<UpdateOutcome, SessionError> {
        let update = ParamUpdate::parse(key, value)?;
        Ok(self.apply_update(update))
    }

    /// Applies an already-typed update.
    ///
    /// `model` is locked while running. A new interval restarts the schedule
    /// (with an immediate tick) but keeps the buffers. Everything else is
    /// picked up by the next tick.
    pub fn apply_update(&self, update: ParamUpdate) -> UpdateOutcome {
        let mut scheduler = lock_unpoisoned(&self.shared.scheduler);

        let restart = {
            let mut state = lock_unpoisoned(&self.shared.state);
            if state.running && matches!(update, ParamUpdate::Model(_)) {
                tracing::debug!("model change ignored while running");
                return UpdateOutcome::Locked;
            }

            let previous_interval = state.params.interval_ms;
            let key = update.key();
            state.params.apply(update);
            tracing::debug!(key, "parameter updated");
            self.shared.publish(&state);

            let changed = state.params.interval_ms != previous_interval;
            match state.runtime.clone() {
                Some(runtime) if state.running && changed => {
                    state.retire_schedule();
                    Some(runtime)
                }
                _ => None,
            }
        };

        if let Some(runtime) = restart {
            self.shared.tick();
            self.shared.start_scheduler(&mut scheduler, &runtime);
        }

        UpdateOutcome::Applied
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock_unpoisoned(&self.shared.state).snapshot()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn is_running(&self) -> bool {
        lock_unpoisoned(&self.shared.state).running
    }

    pub fn provider_profile(&self) -> ProviderProfile {
        self.shared.client.profile()
    }
}
