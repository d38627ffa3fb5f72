pub mod aggregator;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod heuristic;
pub mod llm_client;
pub mod model;
pub mod store;
pub mod timer;

pub use engine::{CompletionOutcome, DebateEngine, DebateUpdate, SubmissionOutcome};
pub use error::{DebateError, EvaluatorError, StoreError, UnavailableCategory, ValidationError};
pub use evaluator::{ArgumentEvaluator, FallbackEvaluator, LLMEvaluator};
pub use heuristic::HeuristicEvaluator;
pub use store::{MemoryStore, SessionStore};
