//! Error types for debate-core

use thiserror::Error;
use uuid::Uuid;

use crate::model::{Format, Phase};

/// Input that is rejected before any state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Argument content must not be empty")]
    EmptyArgument,

    #[error("Unrecognised value for {field}: '{value}'")]
    UnknownValue { field: &'static str, value: String },

    #[error("Score {0} is outside the 1-10 range")]
    ScoreOutOfRange(i64),

    #[error("Phase '{phase}' is not part of the {format} format")]
    PhaseNotInFormat { phase: Phase, format: Format },

    #[error("Cannot move from phase '{from}' back to '{to}'")]
    PhaseRegression { from: Phase, to: Phase },
}

/// Failures reported by a [`SessionStore`](crate::store::SessionStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A result already exists for debate {0}")]
    Conflict(Uuid),

    #[error("Storage backend failed: {0}")]
    Backend(String),
}

/// The user-facing category attached to a degraded evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableCategory {
    QuotaExceeded,
    InvalidCredentials,
    GenericUnavailable,
}

impl UnavailableCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableCategory::QuotaExceeded => "quota-exceeded",
            UnavailableCategory::InvalidCredentials => "invalid-credentials",
            UnavailableCategory::GenericUnavailable => "generic-unavailable",
        }
    }

    /// The message shown next to the unscored argument.
    pub fn user_message(&self) -> &'static str {
        match self {
            UnavailableCategory::QuotaExceeded => {
                "quota-exceeded: AI provider quota exceeded, please check your billing settings"
            }
            UnavailableCategory::InvalidCredentials => {
                "invalid-credentials: the AI provider rejected the configured API key"
            }
            UnavailableCategory::GenericUnavailable => {
                "generic-unavailable: AI analysis is temporarily unavailable"
            }
        }
    }
}

/// Errors raised by an [`ArgumentEvaluator`](crate::evaluator::ArgumentEvaluator).
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Evaluator quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Evaluator rejected credentials: {0}")]
    InvalidCredentials(String),

    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Evaluator returned a malformed response: {0}")]
    Malformed(String),

    #[error("Evaluator failed: {0}")]
    Failed(String),
}

impl EvaluatorError {
    /// The degraded-service category, or `None` for hard failures.
    pub fn category(&self) -> Option<UnavailableCategory> {
        match self {
            EvaluatorError::QuotaExceeded(_) => Some(UnavailableCategory::QuotaExceeded),
            EvaluatorError::InvalidCredentials(_) => Some(UnavailableCategory::InvalidCredentials),
            EvaluatorError::Unavailable(_) => Some(UnavailableCategory::GenericUnavailable),
            EvaluatorError::Malformed(_) | EvaluatorError::Failed(_) => None,
        }
    }

    /// Whether the local heuristic may stand in for the provider.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            EvaluatorError::QuotaExceeded(_) | EvaluatorError::InvalidCredentials(_)
        )
    }
}

impl From<serde_json::Error> for EvaluatorError {
    fn from(err: serde_json::Error) -> Self {
        EvaluatorError::Malformed(err.to_string())
    }
}

/// Errors surfaced by [`DebateEngine`](crate::engine::DebateEngine) operations.
#[derive(Error, Debug)]
pub enum DebateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Debate {0} not found")]
    NotFound(Uuid),

    #[error("Result for debate {0} not found")]
    ResultNotFound(Uuid),

    #[error("Debate {0} is not active")]
    NotActive(Uuid),

    #[error("Debate {id} has no phase after '{phase}'; complete it instead")]
    NoNextPhase { id: Uuid, phase: Phase },

    #[error("Argument evaluation failed: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
