pub mod activity;
pub mod cache;
pub mod canonical;
pub mod classifier;
pub mod heuristics;
pub mod lexical;
pub mod pipeline;
pub mod reputation;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use activity::{ActivityLog, DwellTracker, TracingActivityLog};
pub use cache::{CacheTtl, DecisionCache, InMemoryDecisionCache};
pub use canonical::CanonicalUrl;
pub use classifier::{AiClassifier, SafetyClassifier, SafetyLabel};
pub use lexical::{KeywordResult, KeywordScorer, PatternSet};
pub use pipeline::{DecisionEngine, DecisionEngineBuilder, EvaluationContext, PipelineStage};
pub use reputation::{ReputationCheck, SafeBrowsingClient};
