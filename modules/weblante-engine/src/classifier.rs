//! Last-resort AI content classifier.

use std::sync::Arc;
use std::time::Duration;

use ai_client::{truncate_to_char_boundary, AiError, Claude, Completion, Gemini};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use weblante_common::{AgeClass, AiProvider, ClassifierFailurePolicy, Config};

/// Classifier input is cut to this many bytes.
pub const MAX_INPUT_BYTES: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLabel {
    Safe,
    Unsafe,
}

impl SafetyLabel {
    /// Exact, case-insensitive match on the whitespace-trimmed answer.
    pub fn parse(response: &str) -> Option<Self> {
        let answer = response.trim();
        if answer.eq_ignore_ascii_case("safe") {
            Some(SafetyLabel::Safe)
        } else if answer.eq_ignore_ascii_case("unsafe") {
            Some(SafetyLabel::Unsafe)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unrecognized answer: {0:?}")]
    Unrecognized(String),
}

/// Age-aware SAFE/UNSAFE classification. Never fails: implementations
/// resolve their own errors into a label.
#[async_trait]
pub trait SafetyClassifier: Send + Sync {
    async fn classify(&self, text: &str, age_class: AgeClass) -> SafetyLabel;
}

pub struct AiClassifier {
    /// `None` when no provider key is configured; every call then fails.
    completion: Option<Arc<dyn Completion>>,
    failure_policy: ClassifierFailurePolicy,
    timeout: Duration,
}

impl AiClassifier {
    pub fn new(completion: Arc<dyn Completion>, failure_policy: ClassifierFailurePolicy) -> Self {
        Self {
            completion: Some(completion),
            failure_policy,
            timeout: Duration::from_secs(3),
        }
    }

    /// Classifier with no provider behind it. Every classification resolves
    /// through the failure policy.
    pub fn unconfigured(failure_policy: ClassifierFailurePolicy) -> Self {
        Self {
            completion: None,
            failure_policy,
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from configuration. A provider without an API key yields an
    /// unconfigured classifier under the same failure policy.
    pub fn from_config(config: &Config) -> Self {
        let Some(key) = config.classifier_api_key() else {
            warn!(
                provider = ?config.ai_provider,
                policy = ?config.classifier_failure_policy,
                "No AI classifier key configured, classifications follow the failure policy"
            );
            return Self::unconfigured(config.classifier_failure_policy)
                .with_timeout(config.classifier_timeout);
        };
        let completion: Arc<dyn Completion> = match config.ai_provider {
            AiProvider::Gemini => Arc::new(
                Gemini::new(key, &config.gemini_model).with_timeout(config.classifier_timeout),
            ),
            AiProvider::Claude => Arc::new(
                Claude::new(key, &config.claude_model).with_timeout(config.classifier_timeout),
            ),
        };
        info!(
            provider = completion.provider(),
            policy = ?config.classifier_failure_policy,
            "AI classifier enabled"
        );
        Self::new(completion, config.classifier_failure_policy)
            .with_timeout(config.classifier_timeout)
    }

    pub fn is_configured(&self) -> bool {
        self.completion.is_some()
    }

    fn provider(&self) -> &'static str {
        self.completion.as_ref().map_or("none", |c| c.provider())
    }

    pub fn failure_policy(&self) -> ClassifierFailurePolicy {
        self.failure_policy
    }

    /// One classification round trip, surfacing every failure.
    pub async fn try_classify(
        &self,
        text: &str,
        age_class: AgeClass,
    ) -> Result<SafetyLabel, ClassifierError> {
        let completion = self
            .completion
            .as_ref()
            .ok_or_else(|| AiError::Config("no API key configured".into()))?;
        let prompt = build_prompt(text, age_class);
        debug!(provider = completion.provider(), "Classifying content");

        let response = tokio::time::timeout(self.timeout, completion.complete(&prompt))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout))??;

        SafetyLabel::parse(&response).ok_or(ClassifierError::Unrecognized(response))
    }
}

#[async_trait]
impl SafetyClassifier for AiClassifier {
    async fn classify(&self, text: &str, age_class: AgeClass) -> SafetyLabel {
        match self.try_classify(text, age_class).await {
            Ok(label) => label,
            Err(e) => {
                let fallback = match self.failure_policy {
                    ClassifierFailurePolicy::Open => SafetyLabel::Safe,
                    ClassifierFailurePolicy::Closed => SafetyLabel::Unsafe,
                };
                warn!(
                    provider = self.provider(),
                    error = %e,
                    fallback = ?fallback,
                    "AI classification failed"
                );
                fallback
            }
        }
    }
}

pub fn build_prompt(text: &str, age_class: AgeClass) -> String {
    let content = truncate_to_char_boundary(text, MAX_INPUT_BYTES);
    format!(
        "You are a content safety filter for a browser used by {audience}.\n\
         Decide whether the following search query or page content is appropriate for them.\n\
         Treat sexual, pornographic, graphically violent, self-harm and drug content as unsafe.\n\
         Answer with exactly one word: SAFE or UNSAFE.\n\n\
         Content:\n{content}",
        audience = age_class.audience(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;

    #[test]
    fn test_parse_label() {
        assert_eq!(SafetyLabel::parse("SAFE"), Some(SafetyLabel::Safe));
        assert_eq!(SafetyLabel::parse("  unsafe\n"), Some(SafetyLabel::Unsafe));
        assert_eq!(SafetyLabel::parse("\"Safe\""), None);
        assert_eq!(SafetyLabel::parse("**UNSAFE**."), None);
        assert_eq!(SafetyLabel::parse("probably safe"), None);
        assert_eq!(SafetyLabel::parse(""), None);
    }

    #[test]
    fn test_prompt_is_age_aware_and_bounded() {
        let long = "é".repeat(3000);
        let prompt = build_prompt(&long, AgeClass::PreTeen);
        assert!(prompt.contains("aged 9 to 12"));
        assert!(prompt.contains("SAFE or UNSAFE"));
        let content = prompt.split("Content:\n").nth(1).unwrap();
        assert!(content.len() <= MAX_INPUT_BYTES);
    }

    #[tokio::test]
    async fn test_classify_uses_answer() {
        let completion = Arc::new(MockCompletion::answering("UNSAFE"));
        let classifier = AiClassifier::new(completion.clone(), ClassifierFailurePolicy::Open);

        assert_eq!(classifier.classify("query", AgeClass::Teen).await, SafetyLabel::Unsafe);
        let prompts = completion.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("aged 13 to 15"));
    }

    #[tokio::test]
    async fn test_failure_policy_applies_to_errors() {
        let closed = AiClassifier::new(Arc::new(MockCompletion::failing()), ClassifierFailurePolicy::Closed);
        assert_eq!(closed.classify("q", AgeClass::Teen).await, SafetyLabel::Unsafe);

        let open = AiClassifier::new(Arc::new(MockCompletion::failing()), ClassifierFailurePolicy::Open);
        assert_eq!(open.classify("q", AgeClass::Teen).await, SafetyLabel::Safe);
    }

    #[tokio::test]
    async fn test_failure_policy_applies_to_garbage() {
        let classifier = AiClassifier::new(
            Arc::new(MockCompletion::answering("I cannot help with that")),
            ClassifierFailurePolicy::Closed,
        );
        assert!(matches!(
            classifier.try_classify("q", AgeClass::Teen).await,
            Err(ClassifierError::Unrecognized(_))
        ));
        assert_eq!(classifier.classify("q", AgeClass::Teen).await, SafetyLabel::Unsafe);
    }

    #[tokio::test]
    async fn test_timeout_applies_failure_policy() {
        let classifier = AiClassifier::new(
            Arc::new(MockCompletion::answering("SAFE").with_delay(Duration::from_millis(500))),
            ClassifierFailurePolicy::Closed,
        )
        .with_timeout(Duration::from_millis(20));

        assert!(matches!(
            classifier.try_classify("q", AgeClass::EarlyAdult).await,
            Err(ClassifierError::Timeout(_))
        ));
        assert_eq!(classifier.classify("q", AgeClass::EarlyAdult).await, SafetyLabel::Unsafe);
    }

    #[tokio::test]
    async fn test_missing_key_follows_failure_policy() {
        let classifier = AiClassifier::from_config(&Config::default());
        assert!(!classifier.is_configured());
        assert_eq!(classifier.failure_policy(), ClassifierFailurePolicy::Closed);
        assert!(matches!(
            classifier.try_classify("q", AgeClass::Teen).await,
            Err(ClassifierError::Ai(AiError::Config(_)))
        ));
        assert_eq!(classifier.classify("q", AgeClass::Teen).await, SafetyLabel::Unsafe);

        let open = AiClassifier::unconfigured(ClassifierFailurePolicy::Open);
        assert_eq!(open.classify("q", AgeClass::Teen).await, SafetyLabel::Safe);
    }

    #[test]
    fn test_from_config_selects_provider() {
        let config = Config {
            ai_provider: AiProvider::Claude,
            anthropic_api_key: Some("sk-ant-test".into()),
            classifier_failure_policy: ClassifierFailurePolicy::Open,
            ..Config::default()
        };
        let classifier = AiClassifier::from_config(&config);
        assert!(classifier.is_configured());
        assert_eq!(classifier.failure_policy(), ClassifierFailurePolicy::Open);
        assert_eq!(classifier.provider(), "claude");
    }
}
