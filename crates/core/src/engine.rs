//! Debate Session Engine
//!
//! This module implements the lifecycle of a debate: creation, argument
//! submission with scoring and AI rebuttal, forward-only phase changes, and
//! completion with a single stored result. The engine keeps no session state
//! of its own; everything lives in the injected [`SessionStore`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::aggregator::ScoringAggregator;
use crate::error::{DebateError, StoreError, ValidationError};
use crate::evaluator::{ArgumentEvaluator, CounterArgumentRequest, ScoreRequest};
use crate::model::{Argument, Debate, DebateConfig, DebateResult, Phase};
use crate::store::SessionStore;

/// Message attached to a neutral result when the transcript analysis failed
/// with a hard error.
pub const ANALYSIS_UNAVAILABLE: &str = "AI analysis unavailable";

/// What a user submission produced.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub user_argument: Argument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_argument: Option<Argument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_strategy: Option<String>,
    /// Set when the evaluator was unavailable; the submission still stands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The stored result of a completed debate.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    #[serde(flatten)]
    pub result: DebateResult,
    /// Set when the neutral fallback result was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fields a caller may change on an active debate.
#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DebateUpdate {
    pub time_remaining: Option<u32>,
    pub real_time_feedback: Option<bool>,
    /// A later phase of the debate's format; moving backwards is rejected.
    #[schema(example = "rebuttal")]
    pub current_phase: Option<String>,
}

pub struct DebateEngine {
    store: Arc<dyn SessionStore>,
    evaluator: Arc<dyn ArgumentEvaluator>,
    aggregator: ScoringAggregator,
    /// Completion locks keyed by debate; entries die with their last holder.
    completions: Mutex<HashMap<Uuid, Weak<tokio::sync::Mutex<()>>>>,
}

impl DebateEngine {
    pub fn new(store: Arc<dyn SessionStore>, evaluator: Arc<dyn ArgumentEvaluator>) -> Self {
        Self {
            store,
            aggregator: ScoringAggregator::new(evaluator.clone()),
            evaluator,
            completions: Mutex::new(HashMap::new()),
        }
    }

    /// Validates the configuration and opens a debate in its opening phase.
    #[instrument(skip_all, fields(format = %config.format))]
    pub async fn create(&self, config: DebateConfig) -> Result<Debate, DebateError> {
        let settings = config.validate()?;
        let mut debate = Debate::new(settings);
        debate.activate();
        self.store.put(debate.clone()).await?;
        info!(debate_id = %debate.id, topic = %debate.topic, "Debate created");
        Ok(debate)
    }

    pub async fn get(&self, id: Uuid) -> Result<Debate, DebateError> {
        self.store.get(id).await?.ok_or(DebateError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Debate>, DebateError> {
        Ok(self.store.list().await?)
    }

    /// The debate transcript in submission order.
    pub async fn arguments(&self, id: Uuid) -> Result<Vec<Argument>, DebateError> {
        self.get(id).await?;
        Ok(self.store.get_arguments(id).await?)
    }

    pub async fn result(&self, id: Uuid) -> Result<DebateResult, DebateError> {
        self.store
            .get_result(id)
            .await?
            .ok_or(DebateError::ResultNotFound(id))
    }

    async fn get_active(&self, id: Uuid) -> Result<Debate, DebateError> {
        let debate = self.get(id).await?;
        if !debate.is_active() {
            return Err(DebateError::NotActive(id));
        }
        Ok(debate)
    }

    /// Applies caller-supplied field changes to an active debate.
    #[instrument(skip(self, update), fields(debate_id = %id))]
    pub async fn update(&self, id: Uuid, update: DebateUpdate) -> Result<Debate, DebateError> {
        let mut debate = self.get_active(id).await?;
        if let Some(phase) = update.current_phase.as_deref() {
            let phase: Phase = phase.parse()?;
            debate.move_to_phase(phase)?;
        }
        if let Some(seconds) = update.time_remaining {
            debate.time_remaining = seconds;
        }
        if let Some(enabled) = update.real_time_feedback {
            debate.real_time_feedback = enabled;
        }
        self.store.put(debate.clone()).await?;
        Ok(debate)
    }

    /// Records the countdown's remaining seconds on the debate.
    pub async fn sync_time_remaining(&self, id: Uuid, seconds: u32) -> Result<Debate, DebateError> {
        let mut debate = self.get_active(id).await?;
        debate.time_remaining = seconds;
        self.store.put(debate.clone()).await?;
        Ok(debate)
    }

    /// Scores a user argument, stores it, then stores the AI's reply.
    ///
    /// Scoring and generation run strictly one after the other. When the
    /// evaluator is unavailable the user argument is still stored (unscored
    /// if scoring failed) and the outcome carries a category message instead
    /// of an AI reply. Hard evaluator failures are returned as errors after
    /// the user argument has been stored.
    #[instrument(skip(self, content), fields(debate_id = %id))]
    pub async fn submit_user_argument(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<SubmissionOutcome, DebateError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyArgument.into());
        }
        let debate = self.get_active(id).await?;
        let phase = debate.current_phase;

        let score_request = ScoreRequest {
            content: content.to_string(),
            topic: debate.topic.clone(),
            position: debate.user_position,
            format: debate.format,
        };
        let evaluation = match self.evaluator.score_argument(&score_request).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                let user_argument = Argument::from_user(id, phase, content.to_string(), None);
                self.store.append_argument(user_argument.clone()).await?;
                return match e.category() {
                    Some(category) => {
                        warn!(error = %e, category = category.as_str(), "Scoring unavailable; argument stored unscored");
                        Ok(SubmissionOutcome {
                            user_argument,
                            ai_argument: None,
                            ai_strategy: None,
                            error: Some(category.user_message().to_string()),
                        })
                    }
                    None => {
                        error!(error = %e, "Scoring failed; argument stored unscored");
                        Err(e.into())
                    }
                };
            }
        };

        let user_argument = Argument::from_user(id, phase, content.to_string(), Some(evaluation));
        self.store.append_argument(user_argument.clone()).await?;

        let counter_request = CounterArgumentRequest {
            topic: debate.topic.clone(),
            ai_position: debate.user_position.opposite(),
            user_argument: content.to_string(),
            format: debate.format,
            difficulty: debate.ai_difficulty,
            phase,
        };
        let counter = match self.evaluator.generate_counter_argument(&counter_request).await {
            Ok(counter) => counter,
            Err(e) => {
                return match e.category() {
                    Some(category) => {
                        warn!(error = %e, category = category.as_str(), "Counter-argument unavailable");
                        Ok(SubmissionOutcome {
                            user_argument,
                            ai_argument: None,
                            ai_strategy: None,
                            error: Some(category.user_message().to_string()),
                        })
                    }
                    None => {
                        error!(error = %e, "Counter-argument generation failed");
                        Err(e.into())
                    }
                };
            }
        };

        let ai_argument = Argument::from_ai(id, phase, counter.content);
        self.store.append_argument(ai_argument.clone()).await?;
        info!(phase = %phase, "Argument exchange recorded");

        Ok(SubmissionOutcome {
            user_argument,
            ai_argument: Some(ai_argument),
            ai_strategy: Some(counter.strategy),
            error: None,
        })
    }

    /// Moves an active debate to the next phase of its format.
    ///
    /// Returns [`DebateError::NoNextPhase`] on the final phase; callers
    /// complete the debate instead.
    #[instrument(skip(self), fields(debate_id = %id))]
    pub async fn advance_phase(&self, id: Uuid) -> Result<Debate, DebateError> {
        let mut debate = self.get_active(id).await?;
        let from = debate.current_phase;
        if debate.advance_phase().is_none() {
            return Err(DebateError::NoNextPhase { id, phase: from });
        }
        self.store.put(debate.clone()).await?;
        info!(from = %from, to = %debate.current_phase, seconds = debate.time_remaining, "Phase advanced");
        Ok(debate)
    }

    /// Finishes a debate and records its result.
    ///
    /// The result is stored before the debate is marked completed. If the
    /// transcript cannot be analysed the neutral result is recorded instead.
    /// Calling this again returns the stored result unchanged.
    #[instrument(skip(self), fields(debate_id = %id))]
    pub async fn complete(&self, id: Uuid) -> Result<CompletionOutcome, DebateError> {
        let lock = self.completion_lock(id);
        let _guard = lock.lock().await;
        self.complete_locked(id).await
    }

    fn completion_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .completions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }
        if let Some(existing) = locks.get(&id).and_then(Weak::upgrade) {
            return existing;
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(id, Arc::downgrade(&lock));
        lock
    }

    async fn complete_locked(&self, id: Uuid) -> Result<CompletionOutcome, DebateError> {
        let mut debate = self.get(id).await?;
        if let Some(existing) = self.store.get_result(id).await? {
            info!("Debate already completed; returning stored result");
            if !debate.is_completed() {
                debate.mark_completed(existing.created_at);
                self.store.put(debate).await?;
            }
            return Ok(CompletionOutcome {
                result: existing,
                error: None,
            });
        }

        let transcript = self.store.get_arguments(id).await?;
        let (result, error) = match self.aggregator.aggregate(&debate, &transcript).await {
            Ok(result) => (result, None),
            Err(e) => {
                warn!(error = %e, "Debate analysis failed; recording neutral result");
                let message = e
                    .category()
                    .map(|c| c.user_message())
                    .unwrap_or(ANALYSIS_UNAVAILABLE);
                (DebateResult::neutral(id), Some(message.to_string()))
            }
        };

        let result = match self.store.put_result(result.clone()).await {
            Ok(()) => result,
            Err(StoreError::Conflict(_)) => self.result(id).await?,
            Err(e) => return Err(e.into()),
        };

        debate.mark_completed(Utc::now());
        self.store.put(debate).await?;
        info!(winner = %result.winner, overall = result.overall_score.value(), "Debate completed");

        Ok(CompletionOutcome { result, error })
    }
}
