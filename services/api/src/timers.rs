//! Server-side Phase Timers
//!
//! One [`PhaseTimer`] per debate, created on first start. A pump task per
//! timer consumes its events in order: ticks are written to the debate's
//! `timeRemaining` so polling clients see them, and an elapsed countdown
//! moves the debate to its next phase (re-armed, not started) or completes
//! it after the final phase.

use debate_core::model::Debate;
use debate_core::timer::{Countdown, PhaseTimer, TimerEvent};
use debate_core::{DebateEngine, DebateError, DebateUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::TimerState;

pub struct TimerRegistry {
    engine: Arc<DebateEngine>,
    timers: Mutex<HashMap<Uuid, PhaseTimer>>,
    /// Serializes tick writes with commands that change the clock.
    writes: tokio::sync::Mutex<()>,
    tick_interval: Duration,
}

impl TimerRegistry {
    pub fn new(engine: Arc<DebateEngine>) -> Arc<Self> {
        Self::with_tick_interval(engine, Duration::from_secs(1))
    }

    pub fn with_tick_interval(engine: Arc<DebateEngine>, tick_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            engine,
            timers: Mutex::new(HashMap::new()),
            writes: tokio::sync::Mutex::new(()),
            tick_interval,
        })
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<Uuid, PhaseTimer>> {
        self.timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts (or resumes) the countdown for an active debate.
    pub async fn start(self: &Arc<Self>, id: Uuid) -> Result<TimerState, DebateError> {
        let debate = self.engine.get(id).await?;
        if !debate.is_active() {
            return Err(DebateError::NotActive(id));
        }

        let mut timers = self.timers();
        let timer = timers
            .entry(id)
            .or_insert_with(|| self.spawn_timer(&debate));
        if !timer.start() {
            debug!(debate_id = %id, "Countdown already expired; not started");
        }
        Ok(TimerState::from_countdown(debate.current_phase, &timer.snapshot()))
    }

    pub async fn pause(&self, id: Uuid) -> Result<TimerState, DebateError> {
        let debate = self.engine.get(id).await?;
        let snapshot = self.timers().get_mut(&id).map(|timer| {
            timer.pause();
            timer.snapshot()
        });
        Ok(self.state_for(&debate, snapshot))
    }

    /// Halts the countdown and restores the phase's full allotment.
    pub async fn stop(&self, id: Uuid) -> Result<TimerState, DebateError> {
        let _writes = self.writes.lock().await;
        let debate = self.engine.get(id).await?;
        let snapshot = self.timers().get_mut(&id).map(|timer| {
            timer.stop();
            timer.snapshot()
        });
        match snapshot {
            Some(countdown) if debate.is_active() => {
                let debate = self
                    .engine
                    .sync_time_remaining(id, countdown.seconds_remaining())
                    .await?;
                Ok(TimerState::from_countdown(debate.current_phase, &countdown))
            }
            other => Ok(self.state_for(&debate, other)),
        }
    }

    pub async fn state(&self, id: Uuid) -> Result<TimerState, DebateError> {
        let debate = self.engine.get(id).await?;
        let snapshot = self.timers().get(&id).map(PhaseTimer::snapshot);
        Ok(self.state_for(&debate, snapshot))
    }

    /// Applies a caller update, re-arming the countdown when the phase or
    /// the time remaining changed.
    pub async fn update(&self, id: Uuid, update: DebateUpdate) -> Result<Debate, DebateError> {
        let clock_changed = update.current_phase.is_some() || update.time_remaining.is_some();
        let _writes = self.writes.lock().await;
        let debate = self.engine.update(id, update).await?;
        if clock_changed {
            self.rearm(&debate);
        }
        Ok(debate)
    }

    /// Moves the debate to its next phase and re-arms the countdown.
    pub async fn advance_phase(&self, id: Uuid) -> Result<Debate, DebateError> {
        let _writes = self.writes.lock().await;
        let debate = self.engine.advance_phase(id).await?;
        self.rearm(&debate);
        Ok(debate)
    }

    /// Re-arms an existing countdown, halted, from the debate's phase
    /// allotment and its recorded time remaining.
    fn rearm(&self, debate: &Debate) {
        if let Some(timer) = self.timers().get_mut(&debate.id) {
            timer.rearm(debate.phase_seconds(), debate.time_remaining);
        }
    }

    /// Drops the debate's countdown, aborting any pending tick.
    pub fn remove(&self, id: Uuid) {
        self.timers().remove(&id);
    }

    fn state_for(&self, debate: &Debate, snapshot: Option<Countdown>) -> TimerState {
        let countdown = snapshot
            .unwrap_or_else(|| Countdown::resume(debate.phase_seconds(), debate.time_remaining));
        TimerState::from_countdown(debate.current_phase, &countdown)
    }

    fn spawn_timer(self: &Arc<Self>, debate: &Debate) -> PhaseTimer {
        let countdown = Countdown::resume(debate.phase_seconds(), debate.time_remaining);
        let (timer, mut events) = PhaseTimer::from_countdown(countdown, self.tick_interval);
        let registry: Weak<Self> = Arc::downgrade(self);
        let id = debate.id;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.handle_event(id, event).await;
            }
            debug!(debate_id = %id, "Timer event pump finished");
        });
        timer
    }

    async fn handle_event(&self, id: Uuid, event: TimerEvent) {
        match event {
            TimerEvent::Tick(seconds) => {
                let _writes = self.writes.lock().await;
                // Ticks queued before a stop or re-arm no longer match the countdown.
                let current = self.timers().get(&id).map(|t| t.snapshot().seconds_remaining());
                if current != Some(seconds) {
                    debug!(debate_id = %id, seconds, "Dropping stale tick");
                    return;
                }
                if let Err(e) = self.engine.sync_time_remaining(id, seconds).await {
                    warn!(debate_id = %id, error = %e, "Failed to record remaining time");
                }
            }
            TimerEvent::Complete => self.phase_elapsed(id).await,
        }
    }

    async fn phase_elapsed(&self, id: Uuid) {
        match self.advance_phase(id).await {
            Ok(debate) => {
                info!(debate_id = %id, phase = %debate.current_phase, "Phase time elapsed; moved to next phase");
            }
            Err(DebateError::NoNextPhase { .. }) => {
                self.remove(id);
                match self.engine.complete(id).await {
                    Ok(outcome) => {
                        info!(debate_id = %id, winner = %outcome.result.winner, "Final phase elapsed; debate completed")
                    }
                    Err(e) => warn!(debate_id = %id, error = %e, "Failed to complete debate"),
                }
            }
            Err(e) => {
                warn!(debate_id = %id, error = %e, "Phase elapsed on a debate that cannot advance");
                self.remove(id);
            }
        }
    }
}
