//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the debate engine
//! and the server-side timers shared by every handler.

use crate::timers::TimerRegistry;
use debate_core::DebateEngine;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DebateEngine>,
    pub timers: Arc<TimerRegistry>,
}

impl AppState {
    pub fn new(engine: Arc<DebateEngine>) -> Self {
        let timers = TimerRegistry::new(engine.clone());
        Self { engine, timers }
    }
}
