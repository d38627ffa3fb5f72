//! Debate Domain Model
//!
//! This module defines the entities the debate engine works with (debates,
//! arguments and end-of-debate results) together with the closed enums that
//! describe a debate's configuration and lifecycle. Every enum round-trips
//! through its wire name and rejects anything it does not recognise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationError;

/// Duration used for any `(format, phase)` pair without an explicit entry.
pub const DEFAULT_PHASE_SECONDS: u32 = 360;

/// Implements `Display` and `FromStr` for a unit enum from a table of wire names.
macro_rules! wire_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// The wire name of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ValidationError::UnknownValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Oxford,
    Parliamentary,
    LincolnDouglas,
    PublicForum,
}

wire_enum!(Format, "format", {
    Oxford => "oxford",
    Parliamentary => "parliamentary",
    LincolnDouglas => "lincoln-douglas",
    PublicForum => "public-forum",
});

impl Format {
    /// The ordered phases a debate in this format moves through.
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            Format::Oxford | Format::Parliamentary => {
                &[Phase::Opening, Phase::Rebuttal, Phase::Closing]
            }
            Format::LincolnDouglas => &[Phase::Opening, Phase::Rebuttal],
            Format::PublicForum => &[Phase::Opening, Phase::Rebuttal, Phase::Summary],
        }
    }

    /// The phase that follows `phase`, or `None` when `phase` is the last one
    /// (or not part of this format at all).
    pub fn next_phase(&self, phase: Phase) -> Option<Phase> {
        let phases = self.phases();
        let idx = phases.iter().position(|p| *p == phase)?;
        phases.get(idx + 1).copied()
    }

    fn phase_index(&self, phase: Phase) -> Option<usize> {
        self.phases().iter().position(|p| *p == phase)
    }
}

/// Looks up the allotted seconds for a phase of a given format.
///
/// Unmapped combinations fall back to [`DEFAULT_PHASE_SECONDS`].
pub fn phase_duration(format: Format, phase: Phase) -> u32 {
    match (format, phase) {
        (Format::Oxford, Phase::Opening) => 360,
        (Format::Oxford, Phase::Rebuttal) => 240,
        (Format::Parliamentary, Phase::Opening) => 420,
        (Format::Parliamentary, Phase::Rebuttal) => 480,
        (Format::LincolnDouglas, Phase::Opening) => 360,
        (Format::LincolnDouglas, Phase::Rebuttal) => 180,
        (Format::PublicForum, Phase::Opening) => 240,
        (Format::PublicForum, Phase::Rebuttal) => 180,
        (Format::PublicForum, Phase::Summary) => 120,
        _ => DEFAULT_PHASE_SECONDS,
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Pro,
    Con,
}

wire_enum!(Position, "userPosition", {
    Pro => "pro",
    Con => "con",
});

impl Position {
    /// The side the AI opponent argues.
    pub fn opposite(&self) -> Position {
        match self {
            Position::Pro => Position::Con,
            Position::Con => Position::Pro,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

wire_enum!(Difficulty, "aiDifficulty", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

impl Difficulty {
    /// Style guidance handed to the language model for this tier.
    pub fn style(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Use simple, clear arguments with basic reasoning",
            Difficulty::Intermediate => "Use moderate complexity with some nuanced points",
            Difficulty::Advanced => "Use sophisticated arguments with complex reasoning",
            Difficulty::Expert => {
                "Use highly sophisticated arguments with deep analysis and expert-level reasoning"
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Setup,
    Active,
    Completed,
}

wire_enum!(DebateStatus, "status", {
    Setup => "setup",
    Active => "active",
    Completed => "completed",
});

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Rebuttal,
    Closing,
    Summary,
}

wire_enum!(Phase, "currentPhase", {
    Opening => "opening",
    Rebuttal => "rebuttal",
    Closing => "closing",
    Summary => "summary",
});

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

wire_enum!(Speaker, "speaker", {
    User => "user",
    Ai => "ai",
});

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    User,
    Ai,
    Tie,
}

wire_enum!(Winner, "winner", {
    User => "user",
    Ai => "ai",
    Tie => "tie",
});

/// A score on the 1..=10 scale.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Clamps any integer into range.
    pub fn clamped(value: i64) -> Self {
        Score(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Rounds an upstream value to the nearest integer and clamps it.
    /// Missing or non-finite values count as 5.
    pub fn from_raw(value: Option<f64>) -> Self {
        let v = value.filter(|v| v.is_finite()).unwrap_or(5.0);
        Self::clamped(v.round() as i64)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(ValidationError::ScoreOutOfRange(value))
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Structured coaching notes attached to a scored user argument.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Settings a caller supplies to open a new debate.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DebateConfig {
    #[schema(example = "Social media does more harm than good")]
    pub topic: String,
    #[schema(example = "oxford")]
    pub format: String,
    #[schema(example = "pro")]
    pub user_position: String,
    #[schema(example = "intermediate")]
    pub ai_difficulty: String,
    #[serde(default = "default_real_time_feedback")]
    pub real_time_feedback: bool,
}

fn default_real_time_feedback() -> bool {
    true
}

/// A validated [`DebateConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct DebateSettings {
    pub topic: String,
    pub format: Format,
    pub user_position: Position,
    pub ai_difficulty: Difficulty,
    pub real_time_feedback: bool,
}

impl DebateConfig {
    /// Checks the topic and every enum-valued field.
    pub fn validate(&self) -> Result<DebateSettings, ValidationError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        Ok(DebateSettings {
            topic: topic.to_string(),
            format: self.format.parse()?,
            user_position: self.user_position.parse()?,
            ai_difficulty: self.ai_difficulty.parse()?,
            real_time_feedback: self.real_time_feedback,
        })
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Debate {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub topic: String,
    pub format: Format,
    pub user_position: Position,
    pub ai_difficulty: Difficulty,
    pub status: DebateStatus,
    pub current_phase: Phase,
    pub time_remaining: u32,
    pub real_time_feedback: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Debate {
    /// Builds a debate in `setup` with the opening phase's full allotment.
    pub fn new(settings: DebateSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: settings.topic,
            format: settings.format,
            user_position: settings.user_position,
            ai_difficulty: settings.ai_difficulty,
            status: DebateStatus::Setup,
            current_phase: Phase::Opening,
            time_remaining: phase_duration(settings.format, Phase::Opening),
            real_time_feedback: settings.real_time_feedback,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Moves a freshly created debate from `setup` to `active`.
    pub fn activate(&mut self) {
        if self.status == DebateStatus::Setup {
            self.status = DebateStatus::Active;
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DebateStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == DebateStatus::Completed
    }

    /// The phase after the current one in this debate's format.
    pub fn next_phase(&self) -> Option<Phase> {
        self.format.next_phase(self.current_phase)
    }

    pub fn is_final_phase(&self) -> bool {
        self.next_phase().is_none()
    }

    /// Allotted seconds for the current phase.
    pub fn phase_seconds(&self) -> u32 {
        phase_duration(self.format, self.current_phase)
    }

    /// Steps forward one phase and re-arms the clock.
    ///
    /// Returns `None`, leaving the debate untouched, when there is no next phase.
    pub fn advance_phase(&mut self) -> Option<Phase> {
        let next = self.next_phase()?;
        self.current_phase = next;
        self.time_remaining = phase_duration(self.format, next);
        Some(next)
    }

    /// Jumps to `target` if it lies strictly ahead of the current phase.
    pub fn move_to_phase(&mut self, target: Phase) -> Result<(), ValidationError> {
        let current = self.format.phase_index(self.current_phase);
        let wanted = self
            .format
            .phase_index(target)
            .ok_or(ValidationError::PhaseNotInFormat {
                phase: target,
                format: self.format,
            })?;
        match current {
            Some(current) if wanted > current => {
                self.current_phase = target;
                self.time_remaining = phase_duration(self.format, target);
                Ok(())
            }
            _ => Err(ValidationError::PhaseRegression {
                from: self.current_phase,
                to: target,
            }),
        }
    }

    /// Marks the debate finished. Only the engine calls this, after the
    /// result has been stored.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = DebateStatus::Completed;
        self.completed_at = Some(at);
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, format = Uuid)]
    pub debate_id: Uuid,
    pub speaker: Speaker,
    pub content: String,
    pub phase: Phase,
    pub strength_score: Option<Score>,
    pub logic_score: Option<Score>,
    pub persuasiveness_score: Option<Score>,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

impl Argument {
    /// A user argument, scored when an evaluation is available.
    pub fn from_user(
        debate_id: Uuid,
        phase: Phase,
        content: String,
        evaluation: Option<ArgumentEvaluation>,
    ) -> Self {
        let (strength, logic, persuasiveness, feedback) = match evaluation {
            Some(e) => (
                Some(e.strength_score),
                Some(e.logic_score),
                Some(e.persuasiveness_score),
                Some(e.feedback),
            ),
            None => (None, None, None, None),
        };
        Self {
            id: Uuid::new_v4(),
            debate_id,
            speaker: Speaker::User,
            content,
            phase,
            strength_score: strength,
            logic_score: logic,
            persuasiveness_score: persuasiveness,
            feedback,
            created_at: Utc::now(),
        }
    }

    /// An AI argument. These never carry scores or feedback.
    pub fn from_ai(debate_id: Uuid, phase: Phase, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            debate_id,
            speaker: Speaker::Ai,
            content,
            phase,
            strength_score: None,
            logic_score: None,
            persuasiveness_score: None,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_scored(&self) -> bool {
        self.strength_score.is_some()
    }
}

/// The evaluator's verdict on a single user argument.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentEvaluation {
    pub strength_score: Score,
    pub logic_score: Score,
    pub persuasiveness_score: Score,
    pub feedback: Feedback,
}

/// A generated opposing argument and the reasoning behind it.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CounterArgument {
    pub content: String,
    pub strategy: String,
}

/// The evaluator's verdict on a whole transcript, before it is tied to a debate.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    pub overall_score: Score,
    pub strength_score: Score,
    pub logic_score: Score,
    pub persuasiveness_score: Score,
    pub response_score: Score,
    pub winner: Winner,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebateResult {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, format = Uuid)]
    pub debate_id: Uuid,
    pub overall_score: Score,
    pub strength_score: Score,
    pub logic_score: Score,
    pub persuasiveness_score: Score,
    pub response_score: Score,
    pub winner: Winner,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl DebateResult {
    pub fn from_analysis(debate_id: Uuid, analysis: PerformanceAnalysis) -> Self {
        Self {
            id: Uuid::new_v4(),
            debate_id,
            overall_score: analysis.overall_score,
            strength_score: analysis.strength_score,
            logic_score: analysis.logic_score,
            persuasiveness_score: analysis.persuasiveness_score,
            response_score: analysis.response_score,
            winner: analysis.winner,
            strengths: analysis.strengths,
            improvements: analysis.improvements,
            created_at: Utc::now(),
        }
    }

    /// The fixed result recorded when the transcript could not be analysed.
    pub fn neutral(debate_id: Uuid) -> Self {
        let seven = Score::clamped(7);
        Self {
            id: Uuid::new_v4(),
            debate_id,
            overall_score: seven,
            strength_score: seven,
            logic_score: seven,
            persuasiveness_score: seven,
            response_score: seven,
            winner: Winner::Tie,
            strengths: vec!["Good effort".to_string(), "Clear communication".to_string()],
            improvements: vec![
                "Add more evidence".to_string(),
                "Strengthen conclusions".to_string(),
            ],
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(format: Format) -> DebateSettings {
        DebateSettings {
            topic: "X should happen".to_string(),
            format,
            user_position: Position::Pro,
            ai_difficulty: Difficulty::Beginner,
            real_time_feedback: true,
        }
    }

    #[test]
    fn test_phase_duration_table() {
        assert_eq!(phase_duration(Format::Oxford, Phase::Opening), 360);
        assert_eq!(phase_duration(Format::Oxford, Phase::Rebuttal), 240);
        assert_eq!(phase_duration(Format::Parliamentary, Phase::Opening), 420);
        assert_eq!(phase_duration(Format::Parliamentary, Phase::Rebuttal), 480);
        assert_eq!(phase_duration(Format::LincolnDouglas, Phase::Opening), 360);
        assert_eq!(phase_duration(Format::LincolnDouglas, Phase::Rebuttal), 180);
        assert_eq!(phase_duration(Format::PublicForum, Phase::Opening), 240);
        assert_eq!(phase_duration(Format::PublicForum, Phase::Rebuttal), 180);
        assert_eq!(phase_duration(Format::PublicForum, Phase::Summary), 120);
    }

    #[test]
    fn test_unmapped_phase_defaults() {
        assert_eq!(phase_duration(Format::Oxford, Phase::Closing), 360);
        assert_eq!(phase_duration(Format::Parliamentary, Phase::Closing), 360);
        assert_eq!(phase_duration(Format::LincolnDouglas, Phase::Summary), 360);
        assert_eq!(phase_duration(Format::PublicForum, Phase::Closing), 360);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!("lincoln-douglas".parse::<Format>().unwrap(), Format::LincolnDouglas);
        assert_eq!(Format::PublicForum.to_string(), "public-forum");
        assert_eq!(
            serde_json::to_string(&Format::LincolnDouglas).unwrap(),
            "\"lincoln-douglas\""
        );
        assert_eq!(serde_json::to_string(&Speaker::Ai).unwrap(), "\"ai\"");
        assert_eq!("expert".parse::<Difficulty>().unwrap(), Difficulty::Expert);
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        assert!("Oxford".parse::<Format>().is_err());
        assert!("neutral".parse::<Position>().is_err());
        assert!(serde_json::from_str::<Winner>("\"draw\"").is_err());
        match "grandmaster".parse::<Difficulty>() {
            Err(ValidationError::UnknownValue { field, value }) => {
                assert_eq!(field, "aiDifficulty");
                assert_eq!(value, "grandmaster");
            }
            other => panic!("expected UnknownValue, got {:?}", other),
        }
    }

    #[test]
    fn test_config_validation_trims_topic() {
        let config = DebateConfig {
            topic: "   ".to_string(),
            format: "oxford".to_string(),
            user_position: "pro".to_string(),
            ai_difficulty: "beginner".to_string(),
            real_time_feedback: true,
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyTopic));

        let config = DebateConfig {
            topic: "  Cities should ban cars  ".to_string(),
            ..config
        };
        assert_eq!(config.validate().unwrap().topic, "Cities should ban cars");
    }

    #[test]
    fn test_score_clamping() {
        assert_eq!(Score::from_raw(Some(11.4)).value(), 10);
        assert_eq!(Score::from_raw(Some(-3.0)).value(), 1);
        assert_eq!(Score::from_raw(Some(6.5)).value(), 7);
        assert_eq!(Score::from_raw(None).value(), 5);
        assert_eq!(Score::from_raw(Some(f64::NAN)).value(), 5);
        assert!(serde_json::from_str::<Score>("0").is_err());
        assert_eq!(serde_json::from_str::<Score>("8").unwrap().value(), 8);
    }

    #[test]
    fn test_phase_sequences() {
        let mut debate = Debate::new(settings(Format::PublicForum));
        assert_eq!(debate.advance_phase(), Some(Phase::Rebuttal));
        assert_eq!(debate.time_remaining, 180);
        assert_eq!(debate.advance_phase(), Some(Phase::Summary));
        assert_eq!(debate.time_remaining, 120);
        assert!(debate.is_final_phase());
        assert_eq!(debate.advance_phase(), None);
        assert_eq!(debate.current_phase, Phase::Summary);

        let mut ld = Debate::new(settings(Format::LincolnDouglas));
        assert_eq!(ld.advance_phase(), Some(Phase::Rebuttal));
        assert_eq!(ld.advance_phase(), None);
    }

    #[test]
    fn test_move_to_phase_never_regresses() {
        let mut debate = Debate::new(settings(Format::Oxford));
        debate.move_to_phase(Phase::Closing).unwrap();
        assert_eq!(debate.current_phase, Phase::Closing);
        assert!(matches!(
            debate.move_to_phase(Phase::Rebuttal),
            Err(ValidationError::PhaseRegression { .. })
        ));
        assert!(matches!(
            debate.move_to_phase(Phase::Summary),
            Err(ValidationError::PhaseNotInFormat { .. })
        ));
    }

    #[test]
    fn test_ai_argument_is_unscored() {
        let arg = Argument::from_ai(Uuid::new_v4(), Phase::Opening, "Counter".to_string());
        assert!(!arg.is_scored());
        assert!(arg.feedback.is_none());
        assert_eq!(arg.speaker, Speaker::Ai);
    }

    #[test]
    fn test_debate_serializes_camel_case() {
        let debate = Debate::new(settings(Format::Oxford));
        let json = serde_json::to_value(&debate).unwrap();
        assert_eq!(json["currentPhase"], "opening");
        assert_eq!(json["timeRemaining"], 360);
        assert_eq!(json["userPosition"], "pro");
        assert!(json["completedAt"].is_null());
    }

    #[test]
    fn test_neutral_result() {
        let result = DebateResult::neutral(Uuid::new_v4());
        assert_eq!(result.overall_score.value(), 7);
        assert_eq!(result.response_score.value(), 7);
        assert_eq!(result.winner, Winner::Tie);
        assert_eq!(result.strengths.len(), 2);
        assert_eq!(result.improvements.len(), 2);
    }
}
