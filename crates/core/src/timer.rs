//! Phase Countdown Timer
//!
//! [`Countdown`] holds the pure timer state and decides when ticks and the
//! completion notification fire. [`PhaseTimer`] drives a shared `Countdown`
//! from a tokio task, one decrement per tick interval, and delivers the
//! resulting [`TimerEvent`]s over a channel so a single consumer handles them
//! in order.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Notifications emitted while a countdown runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Seconds left after a decrement.
    Tick(u32),
    /// The countdown reached zero. Fires once per arming.
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    initial: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new(initial_seconds: u32) -> Self {
        Self {
            initial: initial_seconds,
            remaining: initial_seconds,
            running: false,
        }
    }

    /// An idle countdown for an allotment that has already partly run.
    pub fn resume(initial_seconds: u32, remaining_seconds: u32) -> Self {
        Self {
            initial: initial_seconds,
            remaining: remaining_seconds,
            running: false,
        }
    }

    /// Starts counting. Returns `false` (and stays idle) when already expired.
    pub fn start(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Halts and restores the initial duration.
    pub fn stop(&mut self) {
        self.running = false;
        self.remaining = self.initial;
    }

    /// Halts and re-arms, optionally with a new initial duration.
    pub fn reset(&mut self, initial_seconds: Option<u32>) {
        if let Some(initial) = initial_seconds {
            self.initial = initial;
        }
        self.stop();
    }

    /// Advances one second. Returns the events this decrement produced.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.running || self.remaining == 0 {
            return Vec::new();
        }
        self.remaining -= 1;
        let mut events = vec![TimerEvent::Tick(self.remaining)];
        if self.remaining == 0 {
            self.running = false;
            events.push(TimerEvent::Complete);
        }
        events
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.remaining
    }

    pub fn initial_seconds(&self) -> u32 {
        self.initial
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fraction of the allotment still left, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.initial == 0 {
            return 0.0;
        }
        (self.remaining as f64 / self.initial as f64).clamp(0.0, 1.0)
    }

    /// `m:ss` rendering of the remaining time.
    pub fn formatted(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

/// A countdown driven by a background tokio task.
///
/// Pausing or stopping aborts the task, so no tick scheduled before the
/// command is delivered afterwards.
pub struct PhaseTimer {
    countdown: Arc<Mutex<Countdown>>,
    events: mpsc::UnboundedSender<TimerEvent>,
    tick_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PhaseTimer {
    /// Creates an idle timer and the receiver its events arrive on.
    pub fn new(initial_seconds: u32) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        Self::with_tick_interval(initial_seconds, Duration::from_secs(1))
    }

    pub fn with_tick_interval(
        initial_seconds: u32,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        Self::from_countdown(Countdown::new(initial_seconds), tick_interval)
    }

    /// Wraps an existing countdown state. The timer starts idle.
    pub fn from_countdown(
        mut countdown: Countdown,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        countdown.pause();
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            countdown: Arc::new(Mutex::new(countdown)),
            events: tx,
            tick_interval,
            handle: None,
        };
        (timer, rx)
    }

    /// Begins ticking. A no-op when already running or when expired.
    pub fn start(&mut self) -> bool {
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return true;
        }
        if !self.lock().start() {
            debug!("Ignoring start on an expired countdown");
            return false;
        }

        let countdown = self.countdown.clone();
        let events = self.events.clone();
        let interval = self.tick_interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let produced = match countdown.lock() {
                    Ok(mut c) => c.tick(),
                    Err(_) => break,
                };
                let finished = produced.contains(&TimerEvent::Complete);
                for event in produced {
                    if events.send(event).is_err() {
                        return;
                    }
                }
                if finished {
                    break;
                }
            }
        }));
        true
    }

    pub fn pause(&mut self) {
        self.abort_task();
        self.lock().pause();
    }

    pub fn stop(&mut self) {
        self.abort_task();
        self.lock().stop();
    }

    /// Stops and replaces the countdown with `allotment` of which only
    /// `remaining` seconds are left. A phase change re-arms with both equal.
    pub fn rearm(&mut self, allotment: u32, remaining: u32) {
        self.abort_task();
        *self.lock() = Countdown::resume(allotment, remaining);
    }

    /// A copy of the current countdown state.
    pub fn snapshot(&self) -> Countdown {
        self.lock().clone()
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Countdown> {
        // Countdown methods never panic while the lock is held.
        self.countdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}
