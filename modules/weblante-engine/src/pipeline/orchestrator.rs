use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info, warn};

use weblante_common::{ActivityRecord, Config, Decision, DecisionRequest, SessionContext};

use super::stages::*;
use super::{EvaluationContext, PipelineStage};
use crate::activity::{ActivityLog, DwellTracker, TracingActivityLog};
use crate::cache::{DecisionCache, InMemoryDecisionCache};
use crate::classifier::{AiClassifier, SafetyClassifier};
use crate::lexical::{KeywordScorer, PatternSet};
use crate::reputation::{ReputationCheck, SafeBrowsingClient};

pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5000);

struct Outcome {
    decision: Decision,
    cacheable: bool,
}

/// Runs the stage list for one navigation and performs the side effects
/// (cache write, activity record).
pub struct DecisionEngine {
    stages: Vec<Box<dyn PipelineStage>>,
    cache: Arc<dyn DecisionCache>,
    activity: Arc<dyn ActivityLog>,
    dwell: DwellTracker,
    deadline: Duration,
}

impl DecisionEngine {
    pub fn builder() -> DecisionEngineBuilder {
        DecisionEngineBuilder::default()
    }

    /// Engine over an arbitrary stage list.
    pub fn with_stages(
        stages: Vec<Box<dyn PipelineStage>>,
        cache: Arc<dyn DecisionCache>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            stages,
            cache,
            activity,
            dwell: DwellTracker::new(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Production wiring: Safe Browsing, the configured AI provider, the
    /// in-memory cache and the tracing activity log.
    pub fn from_config(config: &Config) -> Self {
        let mut reputation = SafeBrowsingClient::new(config.safe_browsing_key.clone())
            .with_timeout(config.reputation_timeout);
        if let Some(ref endpoint) = config.safe_browsing_url {
            reputation = reputation.with_endpoint(endpoint);
        }

        Self::builder()
            .reputation(Arc::new(reputation))
            .classifier(Arc::new(AiClassifier::from_config(config)))
            .link_security(config.enable_link_security)
            .deadline(config.decision_deadline)
            .build()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn cache(&self) -> &Arc<dyn DecisionCache> {
        &self.cache
    }

    /// Decide one navigation. Never fails: faults, panics and deadline
    /// expiry all produce the internal-error decision.
    pub async fn decide(&self, request: &DecisionRequest, session: &SessionContext) -> Decision {
        let started = Instant::now();
        let mut ctx = EvaluationContext::new(request.clone(), session.clone());

        let result = AssertUnwindSafe(tokio::time::timeout(self.deadline, self.run(&mut ctx)))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                error!(url = %ctx.url.canonical, error = %e, "Pipeline stage failed");
                internal_error()
            }
            Ok(Err(_)) => {
                error!(url = %ctx.url.canonical, deadline = ?self.deadline, "Decision deadline exceeded");
                internal_error()
            }
            Err(_) => {
                error!(url = %ctx.url.canonical, "Pipeline stage panicked");
                internal_error()
            }
        };

        if outcome.cacheable && !ctx.is_search() && !ctx.served_from_cache {
            self.cache.put(&ctx.request.url, &outcome.decision).await;
        }

        let decision = outcome.decision;
        info!(
            url = %ctx.url.canonical,
            verdict = %decision.verdict,
            stage = ?decision.stage,
            risk_score = decision.risk_score,
            cached = ctx.served_from_cache,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Navigation decided"
        );

        self.record(&ctx, &decision).await;
        decision
    }

    async fn run(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Outcome> {
        for stage in &self.stages {
            if let Some(decision) = stage.evaluate(ctx).await? {
                return Ok(Outcome {
                    decision,
                    cacheable: stage.caches_result(),
                });
            }
        }
        Err(anyhow!("no stage produced a decision"))
    }

    async fn record(&self, ctx: &EvaluationContext, decision: &Decision) {
        let now = Utc::now();
        let duration_ms = self.dwell.observe(ctx.session.session_id, now);
        let record = ActivityRecord::new(
            ctx.url.canonical.clone(),
            decision,
            &ctx.session,
            ctx.served_from_cache,
            duration_ms,
            now,
        );
        if let Err(e) = self.activity.record(record).await {
            warn!(error = %e, "Failed to write activity record");
        }
    }
}

fn internal_error() -> Outcome {
    Outcome {
        decision: Decision::internal_error(),
        cacheable: false,
    }
}

/// Assembles the standard stage list.
pub struct DecisionEngineBuilder {
    cache: Arc<dyn DecisionCache>,
    activity: Arc<dyn ActivityLog>,
    reputation: Option<Arc<dyn ReputationCheck>>,
    classifier: Option<Arc<dyn SafetyClassifier>>,
    scorer: KeywordScorer,
    explicit_patterns: PatternSet,
    fuzzy_patterns: PatternSet,
    link_security: bool,
    deadline: Duration,
}

impl Default for DecisionEngineBuilder {
    fn default() -> Self {
        Self {
            cache: Arc::new(InMemoryDecisionCache::new()),
            activity: Arc::new(TracingActivityLog),
            reputation: None,
            classifier: None,
            scorer: KeywordScorer::new(),
            explicit_patterns: PatternSet::explicit_search(),
            fuzzy_patterns: PatternSet::fuzzy_variants(),
            link_security: false,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl DecisionEngineBuilder {
    pub fn cache(mut self, cache: Arc<dyn DecisionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn reputation(mut self, reputation: Arc<dyn ReputationCheck>) -> Self {
        self.reputation = Some(reputation);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn SafetyClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn keyword_scorer(mut self, scorer: KeywordScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn explicit_patterns(mut self, patterns: PatternSet) -> Self {
        self.explicit_patterns = patterns;
        self
    }

    pub fn fuzzy_patterns(mut self, patterns: PatternSet) -> Self {
        self.fuzzy_patterns = patterns;
        self
    }

    pub fn link_security(mut self, enabled: bool) -> Self {
        self.link_security = enabled;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn build(self) -> DecisionEngine {
        let mut stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(ExplicitSearchStage::new(self.explicit_patterns)),
            Box::new(SocialMediaGateStage),
            Box::new(CacheLookupStage::new(self.cache.clone())),
            Box::new(AdultDomainStage),
        ];
        if let Some(reputation) = self.reputation {
            stages.push(Box::new(ReputationStage::new(reputation)));
        }
        stages.push(Box::new(SuspiciousPathStage));
        if self.link_security {
            stages.push(Box::new(LinkSecurityStage));
        }
        stages.push(Box::new(KeywordStage::new(self.scorer)));
        stages.push(Box::new(FuzzyStage::new(self.fuzzy_patterns)));
        if let Some(classifier) = self.classifier {
            stages.push(Box::new(AiClassifierStage::new(classifier)));
        }
        stages.push(Box::new(AllowlistStage));
        stages.push(Box::new(DefaultAllowStage));

        DecisionEngine::with_stages(stages, self.cache, self.activity).with_deadline(self.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let engine = DecisionEngine::builder().build();
        assert_eq!(
            engine.stage_names(),
            vec![
                "explicit_search",
                "age_social_media",
                "cache",
                "adult_domain",
                "suspicious_path",
                "keywords",
                "fuzzy",
                "allowlist",
                "default_allow",
            ]
        );
    }

    #[test]
    fn test_optional_stages_slot_in_place() {
        let engine = DecisionEngine::builder()
            .reputation(Arc::new(SafeBrowsingClient::new(None)))
            .link_security(true)
            .build();
        let names = engine.stage_names();
        assert_eq!(&names[3..7], &["adult_domain", "safe_browsing", "suspicious_path", "link_security"]);
    }

    #[test]
    fn test_from_config_without_keys() {
        let engine = DecisionEngine::from_config(&Config::default());
        let names = engine.stage_names();
        assert!(names.contains(&"safe_browsing"));
        assert!(names.contains(&"ai_classifier"));
        assert!(!names.contains(&"link_security"));
    }
}
