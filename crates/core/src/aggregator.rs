//! End-of-debate scoring.
//!
//! Folds a debate's transcript into a [`DebateResult`] through a single
//! evaluator call. The aggregator never touches storage; the engine decides
//! what to persist and substitutes [`DebateResult::neutral`] on failure.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::EvaluatorError;
use crate::evaluator::{ArgumentEvaluator, TranscriptSummary};
use crate::model::{Argument, Debate, DebateResult, Speaker};

#[derive(Clone)]
pub struct ScoringAggregator {
    evaluator: Arc<dyn ArgumentEvaluator>,
}

impl ScoringAggregator {
    pub fn new(evaluator: Arc<dyn ArgumentEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Splits the transcript by speaker, keeping each side in order.
    pub fn summarize(debate: &Debate, transcript: &[Argument]) -> TranscriptSummary {
        let contents = |speaker: Speaker| {
            transcript
                .iter()
                .filter(|a| a.speaker == speaker)
                .map(|a| a.content.clone())
                .collect::<Vec<_>>()
        };
        TranscriptSummary {
            topic: debate.topic.clone(),
            user_position: debate.user_position,
            format: debate.format,
            user_arguments: contents(Speaker::User),
            ai_arguments: contents(Speaker::Ai),
        }
    }

    /// Produces an unsaved result for `debate` from its full transcript.
    #[instrument(skip_all, fields(debate_id = %debate.id, arguments = transcript.len()))]
    pub async fn aggregate(
        &self,
        debate: &Debate,
        transcript: &[Argument],
    ) -> Result<DebateResult, EvaluatorError> {
        let summary = Self::summarize(debate, transcript);
        let analysis = self.evaluator.analyze_debate(&summary).await?;
        debug!(winner = %analysis.winner, overall = analysis.overall_score.value(), "Debate analysed");
        Ok(DebateResult::from_analysis(debate.id, analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{CounterArgumentRequest, ScoreRequest};
    use crate::model::{
        ArgumentEvaluation, CounterArgument, DebateSettings, Difficulty, Format,
        PerformanceAnalysis, Phase, Position, Score, Winner,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the transcript it was asked to judge.
    #[derive(Default)]
    struct RecordingJudge {
        seen: Mutex<Option<TranscriptSummary>>,
    }

    #[async_trait]
    impl ArgumentEvaluator for RecordingJudge {
        async fn score_argument(&self, _: &ScoreRequest) -> Result<ArgumentEvaluation, EvaluatorError> {
            unreachable!("aggregation never scores single arguments")
        }
        async fn generate_counter_argument(
            &self,
            _: &CounterArgumentRequest,
        ) -> Result<CounterArgument, EvaluatorError> {
            unreachable!("aggregation never generates arguments")
        }
        async fn analyze_debate(
            &self,
            transcript: &TranscriptSummary,
        ) -> Result<PerformanceAnalysis, EvaluatorError> {
            *self.seen.lock().unwrap() = Some(transcript.clone());
            Ok(PerformanceAnalysis {
                overall_score: Score::clamped(8),
                strength_score: Score::clamped(7),
                logic_score: Score::clamped(9),
                persuasiveness_score: Score::clamped(6),
                response_score: Score::clamped(8),
                winner: Winner::User,
                strengths: vec!["Sharp rebuttals".to_string()],
                improvements: vec!["Slow down".to_string()],
            })
        }
    }

    fn debate() -> Debate {
        Debate::new(DebateSettings {
            topic: "Homework should be abolished".to_string(),
            format: Format::LincolnDouglas,
            user_position: Position::Pro,
            ai_difficulty: Difficulty::Expert,
            real_time_feedback: true,
        })
    }

    #[tokio::test]
    async fn test_aggregate_splits_transcript_by_speaker() {
        let judge = Arc::new(RecordingJudge::default());
        let aggregator = ScoringAggregator::new(judge.clone());
        let d = debate();
        let transcript = vec![
            Argument::from_user(d.id, Phase::Opening, "u1".to_string(), None),
            Argument::from_ai(d.id, Phase::Opening, "a1".to_string()),
            Argument::from_user(d.id, Phase::Rebuttal, "u2".to_string(), None),
            Argument::from_ai(d.id, Phase::Rebuttal, "a2".to_string()),
        ];

        let result = aggregator.aggregate(&d, &transcript).await.unwrap();
        assert_eq!(result.debate_id, d.id);
        assert_eq!(result.winner, Winner::User);
        assert_eq!(result.logic_score.value(), 9);

        let seen = judge.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.user_arguments, vec!["u1", "u2"]);
        assert_eq!(seen.ai_arguments, vec!["a1", "a2"]);
        assert_eq!(seen.format, Format::LincolnDouglas);
    }

    #[tokio::test]
    async fn test_aggregate_propagates_evaluator_failure() {
        let aggregator =
            ScoringAggregator::new(Arc::new(crate::heuristic::HeuristicEvaluator::with_seed(1)));
        assert!(aggregator.aggregate(&debate(), &[]).await.is_err());
    }
}
