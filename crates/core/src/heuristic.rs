//! Offline Heuristic Evaluator
//!
//! Scores arguments from surface markers (length, evidence, examples,
//! citations) and answers with canned counter-arguments. It stands in for the
//! language model when the provider is out of quota, rejects our credentials,
//! or when demo mode is requested. All randomness comes from an injected,
//! seedable generator so a fixed seed reproduces the same output.

use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use regex::Regex;
use std::sync::{LazyLock, Mutex};

use crate::error::EvaluatorError;
use crate::evaluator::{ArgumentEvaluator, CounterArgumentRequest, ScoreRequest, TranscriptSummary};
use crate::model::{
    ArgumentEvaluation, CounterArgument, Difficulty, Feedback, PerformanceAnalysis, Score,
};

static EVIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(stud(y|ies)|research|data|evidence|statistics?|surveys?|polls?)\b")
        .expect("evidence pattern is valid")
});
static EXAMPLES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(examples?|instances?|cases?|such as|for example)\b")
        .expect("example pattern is valid")
});
static CITATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(according to|research shows|studies indicate)\b")
        .expect("citation pattern is valid")
});

const FEEDBACK_CAP: usize = 2;

const SUGGESTIONS: [&str; 4] = [
    "Practice varying your tone and pace for greater impact",
    "Consider the strongest counterarguments and prepare responses",
    "Use transitions to connect ideas more smoothly",
    "Incorporate more persuasive language techniques",
];

const STRATEGIES: [&str; 5] = [
    "Highlighting contradictions in the opposing argument while strengthening my position with evidence",
    "Using logical reasoning to demonstrate why the alternative approach is more effective",
    "Addressing counterarguments proactively while building a comprehensive case",
    "Leveraging empirical evidence and practical examples to support my stance",
    "Focusing on long-term implications and sustainability of different approaches",
];

const BEGINNER: [&str; 3] = [
    "While you make some valid points, I believe the {position} position is stronger. The key issue here is that implementing this approach would create significant benefits for society as a whole. This matters because it addresses fundamental problems we're facing today.",
    "That's an interesting perspective, but I think {position} is the better approach. The evidence shows that this position offers more practical solutions. This would help address the core concerns while avoiding potential negative consequences.",
    "I understand your viewpoint, but {position} makes more sense when we consider the broader implications. The main reason is that this approach is more sustainable and practical. This would lead to better outcomes for everyone involved.",
];

const INTERMEDIATE: [&str; 3] = [
    "While your argument has merit, there are significant counterpoints that strengthen the {position} position. Research consistently shows that this approach offers more comprehensive solutions, and the evidence suggests substantial long-term benefits. Furthermore, practical implementation would be more feasible than your proposed alternative.",
    "Your position overlooks several critical factors that make {position} preferable. Studies indicate that this approach addresses root causes rather than just symptoms, and practical experience shows that similar implementations have succeeded elsewhere. The data demonstrates clear advantages in both effectiveness and sustainability.",
    "I respectfully challenge your conclusion because {position} offers a more balanced solution. The evidence demonstrates that this position accounts for multiple stakeholder interests, and historical precedent suggests that similar approaches have yielded positive results. This comprehensive strategy addresses the complexities you've raised while providing practical benefits.",
];

const ADVANCED: [&str; 3] = [
    "Your argument, while structurally sound, fails to address the fundamental systemic complexities that make {position} the superior approach. The empirical evidence overwhelmingly supports this position through multiple peer-reviewed studies, and when we examine the intersection of economic, social, and environmental factors, the implications become clear that your proposed alternative would create unintended consequences.",
    "I must respectfully but firmly disagree with your assessment because {position} represents the most viable path forward given the multifaceted nature of this issue. The intersection of policy implementation and practical outcomes creates a framework that fundamentally undermines the feasibility of your position, while supporting evidence demonstrates that this approach addresses both immediate concerns and long-term sustainability.",
    "While I appreciate the logical framework of your argument, it contains several critical flaws in its foundational assumptions that make {position} the more defensible stance. The multifaceted nature of this issue requires a nuanced approach that accounts for stakeholder diversity, implementation complexity, and unintended consequences, and the evidence consistently shows that this position offers the most comprehensive solution to the challenges we face.",
];

/// Which content markers an argument carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    pub word_count: usize,
    pub evidence: bool,
    pub examples: bool,
    pub citations: bool,
}

impl Markers {
    pub fn scan(content: &str) -> Self {
        Self {
            word_count: content.split_whitespace().count(),
            evidence: EVIDENCE.is_match(content),
            examples: EXAMPLES.is_match(content),
            citations: CITATIONS.is_match(content),
        }
    }

    /// Length-based base score plus one point per marker, capped at 10.
    pub fn strength(&self) -> u8 {
        let base = (self.word_count / 15 + 3).clamp(4, 10);
        let bonus = [self.evidence, self.examples, self.citations]
            .iter()
            .filter(|present| **present)
            .count();
        (base + bonus).min(10) as u8
    }
}

/// Template tier for a difficulty. Expert shares the intermediate tier.
fn templates_for(difficulty: Difficulty) -> &'static [&'static str; 3] {
    match difficulty {
        Difficulty::Beginner => &BEGINNER,
        Difficulty::Advanced => &ADVANCED,
        Difficulty::Intermediate | Difficulty::Expert => &INTERMEDIATE,
    }
}

pub struct HeuristicEvaluator {
    rng: Mutex<StdRng>,
}

impl HeuristicEvaluator {
    /// A generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A reproducible generator.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut rng)
    }

    /// Scores an argument without any network access.
    pub fn evaluate(&self, content: &str) -> ArgumentEvaluation {
        let markers = Markers::scan(content);
        let strength = markers.strength() as i64;
        let (logic, persuasiveness, suggestions) = self.with_rng(|rng| {
            let logic = jitter(rng, strength);
            let persuasiveness = jitter(rng, strength);
            let suggestions: Vec<String> = SUGGESTIONS
                .choose_multiple(rng, FEEDBACK_CAP)
                .map(|s| s.to_string())
                .collect();
            (logic, persuasiveness, suggestions)
        });

        ArgumentEvaluation {
            strength_score: Score::clamped(strength),
            logic_score: Score::clamped(logic),
            persuasiveness_score: Score::clamped(persuasiveness),
            feedback: Feedback {
                strengths: strengths_for(&markers),
                improvements: improvements_for(&markers),
                suggestions,
            },
        }
    }

    /// Picks a canned rebuttal for the AI's side.
    pub fn counter_argument(&self, request: &CounterArgumentRequest) -> CounterArgument {
        let templates = templates_for(request.difficulty);
        self.with_rng(|rng| {
            let template = templates.choose(rng).copied().unwrap_or(templates[0]);
            let strategy = STRATEGIES.choose(rng).copied().unwrap_or(STRATEGIES[0]);
            CounterArgument {
                content: template.replace("{position}", request.ai_position.as_str()),
                strategy: strategy.to_string(),
            }
        })
    }
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Moves a score one point up or down at random, kept within [3, 10].
fn jitter(rng: &mut StdRng, score: i64) -> i64 {
    let delta = if rng.random_bool(0.5) { 1 } else { -1 };
    (score + delta).clamp(3, 10)
}

fn strengths_for(markers: &Markers) -> Vec<String> {
    let mut pool = Vec::new();
    if markers.evidence {
        pool.push("Good use of supporting evidence");
    }
    if markers.examples {
        pool.push("Effective use of examples to illustrate points");
    }
    pool.extend([
        "Clear articulation of your position on the topic",
        "Logical flow of ideas and reasoning",
        "Strong opening statement that establishes your stance",
    ]);
    pool.into_iter().take(FEEDBACK_CAP).map(str::to_string).collect()
}

fn improvements_for(markers: &Markers) -> Vec<String> {
    [
        if markers.evidence {
            "Could strengthen evidence with more recent sources"
        } else {
            "Consider adding more statistical or research-based evidence"
        },
        if markers.examples {
            "Examples could be more diverse or specific"
        } else {
            "Adding concrete examples would make arguments more relatable"
        },
        if markers.word_count < 50 {
            "Expanding on key points would strengthen the argument"
        } else {
            "Consider addressing potential counterarguments"
        },
    ]
    .into_iter()
    .take(FEEDBACK_CAP)
    .map(str::to_string)
    .collect()
}

#[async_trait]
impl ArgumentEvaluator for HeuristicEvaluator {
    async fn score_argument(
        &self,
        request: &ScoreRequest,
    ) -> Result<ArgumentEvaluation, EvaluatorError> {
        Ok(self.evaluate(&request.content))
    }

    async fn generate_counter_argument(
        &self,
        request: &CounterArgumentRequest,
    ) -> Result<CounterArgument, EvaluatorError> {
        Ok(self.counter_argument(request))
    }

    async fn analyze_debate(
        &self,
        _transcript: &TranscriptSummary,
    ) -> Result<PerformanceAnalysis, EvaluatorError> {
        Err(EvaluatorError::Failed(
            "offline evaluator cannot judge a full debate".to_string(),
        ))
    }
}
