//! API Request and Response Models
//!
//! Payloads specific to the HTTP boundary. Domain entities (`Debate`,
//! `Argument`, `DebateResult`) are serialized straight from `debate-core`.

use debate_core::model::Phase;
use debate_core::timer::Countdown;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SubmitArgumentPayload {
    #[schema(example = "Standardized testing narrows the curriculum to what is easy to measure.")]
    pub content: String,
}

/// Countdown state for the debate's current phase.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[schema(value_type = String, example = "opening")]
    pub phase: Phase,
    pub seconds_remaining: u32,
    pub initial_seconds: u32,
    pub running: bool,
    /// Fraction of the allotment still left, from 0 to 1.
    pub progress: f64,
    #[schema(example = "5:42")]
    pub formatted: String,
}

impl TimerState {
    pub fn from_countdown(phase: Phase, countdown: &Countdown) -> Self {
        Self {
            phase,
            seconds_remaining: countdown.seconds_remaining(),
            initial_seconds: countdown.initial_seconds(),
            running: countdown.is_running(),
            progress: countdown.progress(),
            formatted: countdown.formatted(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
