// Test doubles for the decision pipeline.
//
// One mock per trait boundary:
// - MockReputation (ReputationCheck): host-keyed flags, records queried URLs
// - MockClassifier (SafetyClassifier): fixed label, records inputs
// - MockCompletion (ai_client::Completion): scripted answer, optional delay
// - MemoryActivityLog / FailingActivityLog (ActivityLog)
// - FailingStage / PanickingStage / SlowStage (PipelineStage) for fault paths

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use weblante_common::{ActivityRecord, AgeClass, Decision, WeblanteError};

use crate::activity::ActivityLog;
use crate::canonical;
use crate::classifier::{SafetyClassifier, SafetyLabel};
use crate::pipeline::{EvaluationContext, PipelineStage};
use crate::reputation::{ReputationCheck, UNSAFE_SITE_REASON};

// ---------------------------------------------------------------------------
// MockReputation
// ---------------------------------------------------------------------------

/// Flags registered hosts as unsafe. Everything else is clean.
#[derive(Default)]
pub struct MockReputation {
    flagged: HashSet<String>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockReputation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(mut self, host: &str) -> Self {
        self.flagged.insert(host.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs passed to `check`, in call order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReputationCheck for MockReputation {
    async fn check(&self, url: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        self.flagged
            .contains(&canonical::host(url))
            .then(|| UNSAFE_SITE_REASON.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Answers every classification with the same label.
pub struct MockClassifier {
    label: SafetyLabel,
    seen: Mutex<Vec<(String, AgeClass)>>,
}

impl MockClassifier {
    pub fn new(label: SafetyLabel) -> Self {
        Self {
            label,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn safe() -> Self {
        Self::new(SafetyLabel::Safe)
    }

    pub fn flagging() -> Self {
        Self::new(SafetyLabel::Unsafe)
    }

    /// `(text, age class)` for every call, in order.
    pub fn seen(&self) -> Vec<(String, AgeClass)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SafetyClassifier for MockClassifier {
    async fn classify(&self, text: &str, age_class: AgeClass) -> SafetyLabel {
        self.seen.lock().unwrap().push((text.to_string(), age_class));
        self.label
    }
}

// ---------------------------------------------------------------------------
// MockCompletion
// ---------------------------------------------------------------------------

/// Scripted language-model backend.
pub struct MockCompletion {
    answer: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call returns a network error.
    pub fn failing() -> Self {
        Self {
            answer: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ai_client::Completion for MockCompletion {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> ai_client::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer
            .clone()
            .ok_or_else(|| ai_client::AiError::Network("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// Activity logs
// ---------------------------------------------------------------------------

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn record(&self, record: ActivityRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Rejects every record.
pub struct FailingActivityLog;

#[async_trait]
impl ActivityLog for FailingActivityLog {
    async fn record(&self, _record: ActivityRecord) -> anyhow::Result<()> {
        Err(WeblanteError::ActivityLog("store unavailable".into()).into())
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting stages
// ---------------------------------------------------------------------------

pub struct FailingStage;

#[async_trait]
impl PipelineStage for FailingStage {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn evaluate(&self, _ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        bail!("stage exploded")
    }
}

pub struct PanickingStage;

#[async_trait]
impl PipelineStage for PanickingStage {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn evaluate(&self, _ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        panic!("stage panicked")
    }
}

/// Sleeps before passing, to exercise the decision deadline.
pub struct SlowStage(pub Duration);

#[async_trait]
impl PipelineStage for SlowStage {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn evaluate(&self, _ctx: &mut EvaluationContext) -> anyhow::Result<Option<Decision>> {
        tokio::time::sleep(self.0).await;
        Ok(None)
    }
}
