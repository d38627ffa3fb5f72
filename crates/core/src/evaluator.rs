//! Argument Evaluation Service
//!
//! This module defines the capability the debate engine relies on to judge
//! the user's arguments, answer them as the AI opponent, and assess a finished
//! transcript. It provides an LLM-backed implementation and a composite that
//! falls back to the offline heuristic when the provider cannot be used.

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::error::EvaluatorError;
use crate::heuristic::HeuristicEvaluator;
use crate::llm_client::LLMClient;
use crate::model::{
    ArgumentEvaluation, CounterArgument, Difficulty, Feedback, Format, PerformanceAnalysis, Phase,
    Position, Score, Winner,
};

/// Marker that forces the offline evaluator for a single call when it
/// appears in the topic or the argument text.
pub const DEMO_MARKER: &str = "[DEMO_MODE]";

/// Upper bound on the strengths/improvements kept from a debate analysis.
const MAX_ANALYSIS_POINTS: usize = 6;

/// Everything needed to score one user argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRequest {
    pub content: String,
    pub topic: String,
    pub position: Position,
    pub format: Format,
}

/// Everything needed to produce the AI's reply to a user argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterArgumentRequest {
    pub topic: String,
    /// The side the AI argues, i.e. the opposite of the user's.
    pub ai_position: Position,
    pub user_argument: String,
    pub format: Format,
    pub difficulty: Difficulty,
    pub phase: Phase,
}

/// A debate transcript split by speaker, each side in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSummary {
    pub topic: String,
    pub user_position: Position,
    pub format: Format,
    pub user_arguments: Vec<String>,
    pub ai_arguments: Vec<String>,
}

/// Defines the contract for any service that can judge and generate debate arguments.
///
/// This abstraction allows the engine to swap between an AI provider, the
/// offline heuristic, or a test double without changing session logic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArgumentEvaluator: Send + Sync {
    /// Scores a single user argument on strength, logic and persuasiveness.
    async fn score_argument(
        &self,
        request: &ScoreRequest,
    ) -> Result<ArgumentEvaluation, EvaluatorError>;

    /// Produces the AI opponent's counter-argument and the strategy behind it.
    async fn generate_counter_argument(
        &self,
        request: &CounterArgumentRequest,
    ) -> Result<CounterArgument, EvaluatorError>;

    /// Judges a complete transcript.
    async fn analyze_debate(
        &self,
        transcript: &TranscriptSummary,
    ) -> Result<PerformanceAnalysis, EvaluatorError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEvaluation {
    strength_score: Option<f64>,
    logic_score: Option<f64>,
    persuasiveness_score: Option<f64>,
    feedback: Option<Feedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCounterArgument {
    content: Option<String>,
    strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    overall_score: Option<f64>,
    strength_score: Option<f64>,
    logic_score: Option<f64>,
    persuasiveness_score: Option<f64>,
    response_score: Option<f64>,
    winner: Option<String>,
    strengths: Vec<String>,
    improvements: Vec<String>,
}

/// Parses the model's JSON verdict on one argument, clamping every score.
pub fn parse_evaluation(value: Value) -> Result<ArgumentEvaluation, EvaluatorError> {
    let raw: RawEvaluation = serde_json::from_value(value)?;
    Ok(ArgumentEvaluation {
        strength_score: Score::from_raw(raw.strength_score),
        logic_score: Score::from_raw(raw.logic_score),
        persuasiveness_score: Score::from_raw(raw.persuasiveness_score),
        feedback: raw.feedback.unwrap_or_default(),
    })
}

/// Parses the model's counter-argument, filling in defaults for absent fields.
pub fn parse_counter_argument(value: Value) -> Result<CounterArgument, EvaluatorError> {
    let raw: RawCounterArgument = serde_json::from_value(value)?;
    Ok(CounterArgument {
        content: raw
            .content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| {
                "I disagree with your position and will provide a counter-argument.".to_string()
            }),
        strategy: raw
            .strategy
            .unwrap_or_else(|| "Standard counter-argumentation approach".to_string()),
    })
}

/// Parses the model's verdict on a full debate.
///
/// A missing winner counts as a tie; an unrecognised one is malformed.
pub fn parse_analysis(value: Value) -> Result<PerformanceAnalysis, EvaluatorError> {
    let raw: RawAnalysis = serde_json::from_value(value)?;
    let winner = match raw.winner.as_deref() {
        None => Winner::Tie,
        Some(w) => w
            .trim()
            .to_lowercase()
            .parse::<Winner>()
            .map_err(|e| EvaluatorError::Malformed(e.to_string()))?,
    };
    Ok(PerformanceAnalysis {
        overall_score: Score::from_raw(raw.overall_score),
        strength_score: Score::from_raw(raw.strength_score),
        logic_score: Score::from_raw(raw.logic_score),
        persuasiveness_score: Score::from_raw(raw.persuasiveness_score),
        response_score: Score::from_raw(raw.response_score),
        winner,
        strengths: raw.strengths.into_iter().take(MAX_ANALYSIS_POINTS).collect(),
        improvements: raw.improvements.into_iter().take(MAX_ANALYSIS_POINTS).collect(),
    })
}

/// An implementation of `ArgumentEvaluator` that uses an OpenAI-compatible API.
///
/// Prompt templates come from a map that must include the keys
/// `"score_argument"`, `"counter_argument"` and `"debate_analysis"`. A key
/// with a `_system` suffix overrides the default system prompt for that call.
pub struct LLMEvaluator {
    client: Arc<dyn LLMClient>,
    prompts: HashMap<String, String>,
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

impl LLMEvaluator {
    pub fn new(client: Arc<dyn LLMClient>, prompts: HashMap<String, String>) -> Self {
        Self { client, prompts }
    }

    fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String, EvaluatorError> {
        let template = self
            .prompts
            .get(key)
            .ok_or_else(|| EvaluatorError::Failed(format!("Missing prompt template: '{key}'")))?;
        // One pass over the template; substituted text is never rescanned.
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            vars.iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }

    fn system_prompt(&self, key: &str, default: &str) -> String {
        self.prompts
            .get(&format!("{key}_system"))
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[async_trait]
impl ArgumentEvaluator for LLMEvaluator {
    async fn score_argument(
        &self,
        request: &ScoreRequest,
    ) -> Result<ArgumentEvaluation, EvaluatorError> {
        let prompt = self.render(
            "score_argument",
            &[
                ("topic", request.topic.as_str()),
                ("position", request.position.as_str()),
                ("format", request.format.as_str()),
                ("argument", request.content.as_str()),
            ],
        )?;
        let system = self.system_prompt(
            "score_argument",
            "You are an expert debate coach providing constructive analysis of arguments. Always respond with valid JSON.",
        );
        let value = self.client.complete_json(system, prompt).await?;
        parse_evaluation(value)
    }

    async fn generate_counter_argument(
        &self,
        request: &CounterArgumentRequest,
    ) -> Result<CounterArgument, EvaluatorError> {
        let prompt = self.render(
            "counter_argument",
            &[
                ("topic", request.topic.as_str()),
                ("position", request.ai_position.as_str()),
                ("format", request.format.as_str()),
                ("phase", request.phase.as_str()),
                ("difficulty", request.difficulty.as_str()),
                ("difficulty_style", request.difficulty.style()),
                ("argument", request.user_argument.as_str()),
            ],
        )?;
        let system = self.system_prompt(
            "counter_argument",
            "You are a skilled debate opponent. Generate persuasive arguments appropriate to the specified difficulty level. Always respond with valid JSON.",
        );
        let value = self.client.complete_json(system, prompt).await?;
        parse_counter_argument(value)
    }

    async fn analyze_debate(
        &self,
        transcript: &TranscriptSummary,
    ) -> Result<PerformanceAnalysis, EvaluatorError> {
        let user_arguments = transcript.user_arguments.join("\n\n");
        let ai_arguments = transcript.ai_arguments.join("\n\n");
        let prompt = self.render(
            "debate_analysis",
            &[
                ("topic", transcript.topic.as_str()),
                ("user_position", transcript.user_position.as_str()),
                ("format", transcript.format.as_str()),
                ("user_arguments", user_arguments.as_str()),
                ("ai_arguments", ai_arguments.as_str()),
            ],
        )?;
        let system = self.system_prompt(
            "debate_analysis",
            "You are an expert debate judge providing fair, constructive analysis. Always respond with valid JSON.",
        );
        let value = self.client.complete_json(system, prompt).await?;
        parse_analysis(value)
    }
}

/// Composes a primary evaluator with the offline heuristic.
///
/// The heuristic answers when the primary fails with a quota or credential
/// error, when demo mode is on, or when a call carries [`DEMO_MARKER`].
/// Debate analysis always goes to the primary.
pub struct FallbackEvaluator {
    primary: Arc<dyn ArgumentEvaluator>,
    fallback: HeuristicEvaluator,
    demo_mode: bool,
}

impl FallbackEvaluator {
    pub fn new(primary: Arc<dyn ArgumentEvaluator>, fallback: HeuristicEvaluator) -> Self {
        Self {
            primary,
            fallback,
            demo_mode: false,
        }
    }

    /// Routes every per-argument call to the heuristic.
    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    fn demo_requested(&self, texts: &[&str]) -> bool {
        self.demo_mode || texts.iter().any(|t| t.contains(DEMO_MARKER))
    }
}

fn strip_marker(text: &str) -> String {
    text.replace(DEMO_MARKER, "").trim().to_string()
}

#[async_trait]
impl ArgumentEvaluator for FallbackEvaluator {
    async fn score_argument(
        &self,
        request: &ScoreRequest,
    ) -> Result<ArgumentEvaluation, EvaluatorError> {
        if self.demo_requested(&[&request.topic, &request.content]) {
            info!("Demo mode: scoring argument offline");
            return Ok(self.fallback.evaluate(&strip_marker(&request.content)));
        }
        match self.primary.score_argument(request).await {
            Err(e) if e.allows_fallback() => {
                warn!(error = %e, "Primary evaluator unavailable; scoring argument offline");
                Ok(self.fallback.evaluate(&request.content))
            }
            other => other,
        }
    }

    async fn generate_counter_argument(
        &self,
        request: &CounterArgumentRequest,
    ) -> Result<CounterArgument, EvaluatorError> {
        if self.demo_requested(&[&request.topic]) {
            info!("Demo mode: generating counter-argument offline");
            return Ok(self.fallback.counter_argument(request));
        }
        match self.primary.generate_counter_argument(request).await {
            Err(e) if e.allows_fallback() => {
                warn!(error = %e, "Primary evaluator unavailable; using canned counter-argument");
                Ok(self.fallback.counter_argument(request))
            }
            other => other,
        }
    }

    async fn analyze_debate(
        &self,
        transcript: &TranscriptSummary,
    ) -> Result<PerformanceAnalysis, EvaluatorError> {
        self.primary.analyze_debate(transcript).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;
    use serde_json::json;

    fn prompts() -> HashMap<String, String> {
        HashMap::from([
            (
                "score_argument".to_string(),
                "Topic: {topic}\nPosition: {position}\nFormat: {format}\nArgument: {argument}"
                    .to_string(),
            ),
            (
                "counter_argument".to_string(),
                "Topic: {topic}\nYour position: {position}\nPhase: {phase}\nLevel: {difficulty} - {difficulty_style}\nUser: {argument}".to_string(),
            ),
            (
                "debate_analysis".to_string(),
                "Topic: {topic}\nUser Position: {user_position}\nUser: {user_arguments}\nAI: {ai_arguments}".to_string(),
            ),
        ])
    }

    fn score_request(content: &str) -> ScoreRequest {
        ScoreRequest {
            content: content.to_string(),
            topic: "School uniforms should be mandatory".to_string(),
            position: Position::Pro,
            format: Format::PublicForum,
        }
    }

    fn counter_request(topic: &str) -> CounterArgumentRequest {
        CounterArgumentRequest {
            topic: topic.to_string(),
            ai_position: Position::Con,
            user_argument: "Uniforms reduce bullying.".to_string(),
            format: Format::PublicForum,
            difficulty: Difficulty::Advanced,
            phase: Phase::Rebuttal,
        }
    }

    fn transcript() -> TranscriptSummary {
        TranscriptSummary {
            topic: "School uniforms should be mandatory".to_string(),
            user_position: Position::Pro,
            format: Format::PublicForum,
            user_arguments: vec!["First".to_string(), "Second".to_string()],
            ai_arguments: vec!["Reply".to_string()],
        }
    }

    /// An evaluator that always fails with the error produced by `make_error`.
    struct FailingEvaluator {
        make_error: fn() -> EvaluatorError,
    }

    #[async_trait]
    impl ArgumentEvaluator for FailingEvaluator {
        async fn score_argument(&self, _: &ScoreRequest) -> Result<ArgumentEvaluation, EvaluatorError> {
            Err((self.make_error)())
        }
        async fn generate_counter_argument(
            &self,
            _: &CounterArgumentRequest,
        ) -> Result<CounterArgument, EvaluatorError> {
            Err((self.make_error)())
        }
        async fn analyze_debate(&self, _: &TranscriptSummary) -> Result<PerformanceAnalysis, EvaluatorError> {
            Err((self.make_error)())
        }
    }

    #[test]
    fn test_parse_evaluation_clamps_and_defaults() {
        let evaluation = parse_evaluation(json!({
            "strengthScore": 12,
            "logicScore": 0.4,
            "feedback": { "strengths": ["Clear thesis"] }
        }))
        .unwrap();
        assert_eq!(evaluation.strength_score.value(), 10);
        assert_eq!(evaluation.logic_score.value(), 1);
        assert_eq!(evaluation.persuasiveness_score.value(), 5);
        assert_eq!(evaluation.feedback.strengths, vec!["Clear thesis".to_string()]);
        assert!(evaluation.feedback.improvements.is_empty());
        assert!(evaluation.feedback.suggestions.is_empty());
    }

    #[test]
    fn test_parse_evaluation_rejects_wrong_types() {
        let err = parse_evaluation(json!({ "strengthScore": "very strong" })).unwrap_err();
        assert!(matches!(err, EvaluatorError::Malformed(_)));
    }

    #[test]
    fn test_parse_counter_argument_defaults() {
        let arg = parse_counter_argument(json!({})).unwrap();
        assert!(!arg.content.is_empty());
        assert_eq!(arg.strategy, "Standard counter-argumentation approach");
    }

    #[test]
    fn test_parse_analysis() {
        let analysis = parse_analysis(json!({
            "overallScore": 8.6,
            "strengthScore": 7,
            "logicScore": 15,
            "persuasivenessScore": 6,
            "responseScore": -2,
            "winner": "User",
            "strengths": ["a", "b", "c", "d", "e", "f", "g"],
            "improvements": ["x"]
        }))
        .unwrap();
        assert_eq!(analysis.overall_score.value(), 9);
        assert_eq!(analysis.logic_score.value(), 10);
        assert_eq!(analysis.response_score.value(), 1);
        assert_eq!(analysis.winner, Winner::User);
        assert_eq!(analysis.strengths.len(), 6);

        assert_eq!(parse_analysis(json!({})).unwrap().winner, Winner::Tie);
        assert!(parse_analysis(json!({ "winner": "audience" })).is_err());
    }

    #[tokio::test]
    async fn test_llm_evaluator_renders_prompt() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete_json()
            .withf(|_system, prompt| {
                prompt.contains("Topic: School uniforms should be mandatory")
                    && prompt.contains("Position: pro")
                    && prompt.contains("Format: public-forum")
                    && prompt.contains("Argument: Uniforms build identity.")
            })
            .times(1)
            .returning(|_, _| {
                Ok(json!({ "strengthScore": 8, "logicScore": 7, "persuasivenessScore": 9 }))
            });

        let evaluator = LLMEvaluator::new(Arc::new(client), prompts());
        let evaluation = evaluator
            .score_argument(&score_request("Uniforms build identity."))
            .await
            .unwrap();
        assert_eq!(evaluation.strength_score.value(), 8);
        assert_eq!(evaluation.persuasiveness_score.value(), 9);
    }

    #[tokio::test]
    async fn test_llm_evaluator_leaves_braces_in_values_alone() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete_json()
            .withf(|_, prompt| {
                prompt.contains("Topic: Ban {argument} templates")
                    && prompt.contains("Argument: As {topic} shows, {unknown} stays.")
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "strengthScore": 5 })));

        let evaluator = LLMEvaluator::new(Arc::new(client), prompts());
        let mut request = score_request("As {topic} shows, {unknown} stays.");
        request.topic = "Ban {argument} templates".to_string();
        evaluator.score_argument(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_llm_evaluator_counter_prompt_uses_difficulty_style() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete_json()
            .withf(|_, prompt| {
                prompt.contains("Your position: con")
                    && prompt.contains("Phase: rebuttal")
                    && prompt.contains("advanced - Use sophisticated arguments")
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "content": "No.", "strategy": "Deny" })));

        let evaluator = LLMEvaluator::new(Arc::new(client), prompts());
        let arg = evaluator
            .generate_counter_argument(&counter_request("Uniforms"))
            .await
            .unwrap();
        assert_eq!(arg.content, "No.");
        assert_eq!(arg.strategy, "Deny");
    }

    #[tokio::test]
    async fn test_llm_evaluator_missing_prompt_is_hard_failure() {
        let client = MockLLMClient::new();
        let evaluator = LLMEvaluator::new(Arc::new(client), HashMap::new());
        let err = evaluator.analyze_debate(&transcript()).await.unwrap_err();
        assert!(err.category().is_none());
    }

    #[tokio::test]
    async fn test_llm_evaluator_system_prompt_override() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete_json()
            .withf(|system, prompt| system == "Be a harsh judge." && prompt.contains("User: First\n\nSecond"))
            .times(1)
            .returning(|_, _| Ok(json!({ "overallScore": 4, "winner": "ai" })));

        let mut templates = prompts();
        templates.insert("debate_analysis_system".to_string(), "Be a harsh judge.".to_string());
        let evaluator = LLMEvaluator::new(Arc::new(client), templates);
        let analysis = evaluator.analyze_debate(&transcript()).await.unwrap();
        assert_eq!(analysis.winner, Winner::Ai);
    }

    #[tokio::test]
    async fn test_fallback_on_quota_error() {
        let evaluator = FallbackEvaluator::new(
            Arc::new(FailingEvaluator {
                make_error: || EvaluatorError::QuotaExceeded("429".into()),
            }),
            HeuristicEvaluator::with_seed(11),
        );
        let evaluation = evaluator
            .score_argument(&score_request("According to a recent survey, for example."))
            .await
            .unwrap();
        assert!(evaluation.strength_score.value() >= 6);

        let arg = evaluator
            .generate_counter_argument(&counter_request("Uniforms"))
            .await
            .unwrap();
        assert!(arg.content.contains("con"));
    }

    #[tokio::test]
    async fn test_fallback_on_credential_error() {
        let evaluator = FallbackEvaluator::new(
            Arc::new(FailingEvaluator {
                make_error: || EvaluatorError::InvalidCredentials("401".into()),
            }),
            HeuristicEvaluator::with_seed(12),
        );
        assert!(evaluator.score_argument(&score_request("Fine.")).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_fallback_on_hard_or_transient_errors() {
        let hard = FallbackEvaluator::new(
            Arc::new(FailingEvaluator {
                make_error: || EvaluatorError::Malformed("not json".into()),
            }),
            HeuristicEvaluator::with_seed(13),
        );
        assert!(matches!(
            hard.score_argument(&score_request("Fine.")).await,
            Err(EvaluatorError::Malformed(_))
        ));

        let transient = FallbackEvaluator::new(
            Arc::new(FailingEvaluator {
                make_error: || EvaluatorError::Unavailable("connection reset".into()),
            }),
            HeuristicEvaluator::with_seed(14),
        );
        assert!(matches!(
            transient
                .generate_counter_argument(&counter_request("Uniforms"))
                .await,
            Err(EvaluatorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_demo_marker_bypasses_primary() {
        // The mock has no expectations, so any call to it would panic.
        let primary = LLMEvaluator::new(Arc::new(MockLLMClient::new()), prompts());
        let evaluator =
            FallbackEvaluator::new(Arc::new(primary), HeuristicEvaluator::with_seed(15));

        assert!(
            evaluator
                .score_argument(&score_request("Uniforms work [DEMO_MODE]"))
                .await
                .is_ok()
        );
        assert!(
            evaluator
                .generate_counter_argument(&counter_request("Uniforms [DEMO_MODE]"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_demo_mode_flag_bypasses_primary() {
        let primary = LLMEvaluator::new(Arc::new(MockLLMClient::new()), prompts());
        let evaluator = FallbackEvaluator::new(Arc::new(primary), HeuristicEvaluator::with_seed(16))
            .with_demo_mode(true);
        assert!(evaluator.score_argument(&score_request("Plain.")).await.is_ok());
    }

    #[tokio::test]
    async fn test_analysis_never_falls_back() {
        let mut primary = MockArgumentEvaluator::new();
        primary
            .expect_analyze_debate()
            .times(1)
            .returning(|_| Err(EvaluatorError::QuotaExceeded("429".into())));
        primary.expect_score_argument().never();

        let evaluator = FallbackEvaluator::new(Arc::new(primary), HeuristicEvaluator::with_seed(17));
        assert!(matches!(
            evaluator.analyze_debate(&transcript()).await,
            Err(EvaluatorError::QuotaExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_primary_success_passes_through() {
        let mut primary = MockArgumentEvaluator::new();
        primary
            .expect_generate_counter_argument()
            .withf(|request| request.ai_position == Position::Con)
            .times(1)
            .returning(|_| {
                Ok(CounterArgument {
                    content: "From the model".to_string(),
                    strategy: "Model strategy".to_string(),
                })
            });

        let evaluator = FallbackEvaluator::new(Arc::new(primary), HeuristicEvaluator::with_seed(18));
        let arg = evaluator
            .generate_counter_argument(&counter_request("Uniforms"))
            .await
            .unwrap();
        assert_eq!(arg.content, "From the model");
    }
}
