//! The navigation decision pipeline: an ordered, short-circuiting list of
//! stages. The first stage to return a decision wins.

mod context;
mod orchestrator;
pub mod stages;

use async_trait::async_trait;

use weblante_common::Decision;

pub use context::EvaluationContext;
pub use orchestrator::{DecisionEngine, DecisionEngineBuilder};
pub use stages::is_trivial_query;

#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Decisions from this stage are written to the decision cache (page
    /// navigations only).
    fn caches_result(&self) -> bool {
        false
    }

    /// `Ok(None)` passes to the next stage. `Err` aborts the pipeline with
    /// the internal-error decision.
    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>>;
}
