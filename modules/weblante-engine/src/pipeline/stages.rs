//! The individual pipeline stages, in evaluation order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use weblante_common::{Decision, Stage, Verdict};

use super::{EvaluationContext, PipelineStage};
use crate::cache::DecisionCache;
use crate::classifier::{SafetyClassifier, SafetyLabel};
use crate::heuristics;
use crate::lexical::{is_obfuscated, normalize_text, KeywordScorer, PatternSet};
use crate::reputation::ReputationCheck;

pub const EXPLICIT_SEARCH_REASON: &str = "Explicit search intent detected";
pub const AGE_POLICY_REASON: &str = "Blocked by age-based policy";
pub const FUZZY_REASON: &str = "Obfuscated explicit keyword detected";
pub const AI_MODERATION_REASON: &str = "Blocked by AI content moderation";

/// Social media is gated below this age.
pub const SOCIAL_MEDIA_MIN_AGE: u8 = 16;

const QUESTION_PREFIXES: &[&str] = &[
    "what", "who", "where", "when", "why", "how", "which", "is", "are", "can", "does", "do",
    "define", "meaning of",
];

/// Queries not worth an AI call: very short, or plain questions.
pub fn is_trivial_query(query: &str) -> bool {
    let q = normalize_text(query);
    if q.chars().count() <= 3 {
        return true;
    }
    QUESTION_PREFIXES
        .iter()
        .any(|p| q == *p || q.strip_prefix(p).is_some_and(|rest| rest.starts_with(' ')))
}

// --- 1. Explicit search ---

pub struct ExplicitSearchStage {
    patterns: PatternSet,
}

impl ExplicitSearchStage {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl PipelineStage for ExplicitSearchStage {
    fn name(&self) -> &'static str {
        "explicit_search"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        if !ctx.is_search() {
            return Ok(None);
        }
        let query = ctx.query().to_lowercase();
        Ok(self.patterns.find(&query).map(|category| {
            debug!(category, "Explicit search pattern matched");
            Decision::block(1.0, EXPLICIT_SEARCH_REASON, Stage::ExplicitSearch)
        }))
    }
}

// --- 2. Age-gated social media ---

pub struct SocialMediaGateStage;

#[async_trait]
impl PipelineStage for SocialMediaGateStage {
    fn name(&self) -> &'static str {
        "age_social_media"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        let gated = ctx.policy().is_some()
            && ctx.session.age.is_some_and(|age| age < SOCIAL_MEDIA_MIN_AGE);
        if !gated {
            return Ok(None);
        }
        Ok(heuristics::check_social_media(&ctx.request.url)
            .map(|_| Decision::block(0.9, AGE_POLICY_REASON, Stage::AgeSocialMedia)))
    }
}

// --- 3. Cache lookup ---

pub struct CacheLookupStage {
    cache: Arc<dyn DecisionCache>,
}

impl CacheLookupStage {
    pub fn new(cache: Arc<dyn DecisionCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PipelineStage for CacheLookupStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        if ctx.is_search() {
            return Ok(None);
        }
        let hit = self.cache.get(&ctx.request.url).await;
        if hit.is_some() {
            ctx.served_from_cache = true;
        }
        Ok(hit)
    }
}

// --- 4. Adult domain ---

pub struct AdultDomainStage;

#[async_trait]
impl PipelineStage for AdultDomainStage {
    fn name(&self) -> &'static str {
        "adult_domain"
    }

    fn caches_result(&self) -> bool {
        true
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        Ok(heuristics::check_adult_domain(&ctx.request.url)
            .map(|reason| Decision::block(1.0, reason, Stage::AdultDomain)))
    }
}

// --- 5. Reputation ---

pub struct ReputationStage {
    reputation: Arc<dyn ReputationCheck>,
}

impl ReputationStage {
    pub fn new(reputation: Arc<dyn ReputationCheck>) -> Self {
        Self { reputation }
    }
}

#[async_trait]
impl PipelineStage for ReputationStage {
    fn name(&self) -> &'static str {
        "safe_browsing"
    }

    fn caches_result(&self) -> bool {
        true
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        Ok(self
            .reputation
            .check(&ctx.url.canonical)
            .await
            .map(|reason| Decision::block(1.0, reason, Stage::SafeBrowsing)))
    }
}

// --- 6. Suspicious path ---

pub struct SuspiciousPathStage;

#[async_trait]
impl PipelineStage for SuspiciousPathStage {
    fn name(&self) -> &'static str {
        "suspicious_path"
    }

    fn caches_result(&self) -> bool {
        true
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        Ok(heuristics::check_url_path(&ctx.request.url)
            .map(|reason| Decision::block(0.7, reason, Stage::SuspiciousPath)))
    }
}

// --- 6b. Link security (opt-in) ---

pub struct LinkSecurityStage;

#[async_trait]
impl PipelineStage for LinkSecurityStage {
    fn name(&self) -> &'static str {
        "link_security"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        Ok(heuristics::check_link_security(&ctx.request.url)
            .map(|reason| Decision::block(0.6, reason, Stage::LinkSecurity)))
    }
}

// --- 7. Keywords ---

pub struct KeywordStage {
    scorer: KeywordScorer,
}

impl KeywordStage {
    pub fn new(scorer: KeywordScorer) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl PipelineStage for KeywordStage {
    fn name(&self) -> &'static str {
        "keywords"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        let result = self.scorer.score(&ctx.analysis_text(), ctx.is_search());

        let decision = if result.hard_block {
            Some(Decision::new(Verdict::Block, 1.0, result.reasons.clone(), Stage::KeywordHard))
        } else {
            match ctx.policy() {
                Some(policy) if result.score >= policy.threshold => {
                    Some(Decision::new(
                        Verdict::Block,
                        result.score,
                        result.reasons.clone(),
                        Stage::KeywordThreshold,
                    ))
                }
                _ => None,
            }
        };

        ctx.keywords = Some(result);
        Ok(decision)
    }
}

// --- 8. Fuzzy ---

pub struct FuzzyStage {
    patterns: PatternSet,
}

impl FuzzyStage {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl PipelineStage for FuzzyStage {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        if !ctx.is_search() || ctx.keyword_score() != 0.0 || ctx.policy().is_none() {
            return Ok(None);
        }
        Ok(is_obfuscated(&self.patterns, ctx.query())
            .then(|| Decision::block(0.55, FUZZY_REASON, Stage::Fuzzy)))
    }
}

// --- 9. AI classifier ---

pub struct AiClassifierStage {
    classifier: Arc<dyn SafetyClassifier>,
}

impl AiClassifierStage {
    pub fn new(classifier: Arc<dyn SafetyClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl PipelineStage for AiClassifierStage {
    fn name(&self) -> &'static str {
        "ai_classifier"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        let Some(policy) = ctx.policy() else {
            return Ok(None);
        };
        if !ctx.is_search() || ctx.keyword_score() != 0.0 || is_trivial_query(ctx.query()) {
            return Ok(None);
        }

        let label = self.classifier.classify(ctx.query(), policy.class).await;
        Ok((label == SafetyLabel::Unsafe)
            .then(|| Decision::block(0.8, AI_MODERATION_REASON, Stage::AiClassifier)))
    }
}

// --- 10. Allowlist ---

pub struct AllowlistStage;

#[async_trait]
impl PipelineStage for AllowlistStage {
    fn name(&self) -> &'static str {
        "allowlist"
    }

    fn caches_result(&self) -> bool {
        true
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        if ctx.is_search() {
            return Ok(None);
        }
        Ok(heuristics::check_allowlist(&ctx.request.url)
            .map(|reason| Decision::allow(0.0, vec![reason], Stage::Allowlist)))
    }
}

// --- 11. Default ---

pub struct DefaultAllowStage;

#[async_trait]
impl PipelineStage for DefaultAllowStage {
    fn name(&self) -> &'static str {
        "default_allow"
    }

    fn caches_result(&self) -> bool {
        true
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        let reasons = ctx
            .keywords
            .as_ref()
            .map(|k| k.reasons.clone())
            .unwrap_or_default();
        Ok(Some(Decision::allow(ctx.keyword_score(), reasons, Stage::DefaultAllow)))
    }
}
