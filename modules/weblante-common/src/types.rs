use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::age::{resolve_age_policy, AgeClass, AgePolicy};
use crate::error::WeblanteError;

// --- Verdict ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Block,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Allow => write!(f, "allow"),
            Verdict::Block => write!(f, "block"),
        }
    }
}

// --- Stage ---

/// The pipeline step that produced a terminal decision, recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    ExplicitSearch,
    AgeSocialMedia,
    AdultDomain,
    SafeBrowsing,
    SuspiciousPath,
    LinkSecurity,
    KeywordHard,
    KeywordThreshold,
    Fuzzy,
    AiClassifier,
    Allowlist,
    DefaultAllow,
    InternalError,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::ExplicitSearch => "explicit search",
            Stage::AgeSocialMedia => "age social media",
            Stage::AdultDomain => "adult domain",
            Stage::SafeBrowsing => "safe browsing",
            Stage::SuspiciousPath => "suspicious path",
            Stage::LinkSecurity => "link security",
            Stage::KeywordHard => "keyword hard",
            Stage::KeywordThreshold => "keyword threshold",
            Stage::Fuzzy => "fuzzy",
            Stage::AiClassifier => "ai classifier",
            Stage::Allowlist => "allowlist",
            Stage::DefaultAllow => "default allow",
            Stage::InternalError => "internal error",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// --- Decision ---

/// The sole output of the decision pipeline. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub verdict: Verdict,
    /// Always within [0, 1].
    pub risk_score: f64,
    pub reasons: Vec<String>,
    pub stage: Stage,
}

pub const INTERNAL_ERROR_REASON: &str = "internal error";

impl Decision {
    pub fn new(verdict: Verdict, risk_score: f64, reasons: Vec<String>, stage: Stage) -> Self {
        let risk_score = if risk_score.is_nan() {
            1.0
        } else {
            risk_score.clamp(0.0, 1.0)
        };
        Self {
            verdict,
            risk_score,
            reasons,
            stage,
        }
    }

    pub fn block(risk_score: f64, reason: impl Into<String>, stage: Stage) -> Self {
        Self::new(Verdict::Block, risk_score, vec![reason.into()], stage)
    }

    pub fn allow(risk_score: f64, reasons: Vec<String>, stage: Stage) -> Self {
        Self::new(Verdict::Allow, risk_score, reasons, stage)
    }

    /// Fail-safe decision for unhandled faults: the pipeline is fail-closed
    /// at its outermost boundary.
    pub fn internal_error() -> Self {
        Self::block(1.0, INTERNAL_ERROR_REASON, Stage::InternalError)
    }

    pub fn is_block(&self) -> bool {
        self.verdict == Verdict::Block
    }

    pub fn primary_reason(&self) -> Option<&str> {
        self.reasons.first().map(String::as_str)
    }
}

// --- Request ---

/// One browsing event submitted for a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
}

impl DecisionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// A request must name a non-blank URL.
    pub fn validate(&self) -> Result<(), WeblanteError> {
        if self.url.trim().is_empty() {
            return Err(WeblanteError::Validation("url is required".into()));
        }
        Ok(())
    }
}

// --- Session ---

/// Monitoring session state, set once at session start and passed into
/// every decision explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub age: Option<u8>,
    pub policy: Option<AgePolicy>,
}

impl SessionContext {
    pub fn new(age: Option<u8>) -> Self {
        Self::with_id(Uuid::new_v4(), age)
    }

    pub fn with_id(session_id: Uuid, age: Option<u8>) -> Self {
        Self {
            session_id,
            age,
            policy: age.and_then(resolve_age_policy),
        }
    }

    pub fn age_class(&self) -> Option<AgeClass> {
        self.policy.map(|p| p.class)
    }
}

// --- Activity ---

/// One record per terminal decision, written to the activity log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Canonical URL (search form keeps the decoded query).
    pub url: String,
    pub decision: Verdict,
    pub risk_score: f64,
    pub reasons: Vec<String>,
    pub primary_reason: Option<String>,
    pub stage: Stage,
    /// Served from the decision cache.
    pub cached: bool,
    /// Time since the previous decision in the same session.
    pub duration_ms: i64,
    pub timestamp: DateTime<Utc>,
    pub age: Option<u8>,
    pub age_class: Option<AgeClass>,
    pub session_id: Uuid,
}

impl ActivityRecord {
    pub fn new(
        url: impl Into<String>,
        decision: &Decision,
        session: &SessionContext,
        cached: bool,
        duration_ms: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            decision: decision.verdict,
            risk_score: decision.risk_score,
            reasons: decision.reasons.clone(),
            primary_reason: decision.primary_reason().map(String::from),
            stage: decision.stage,
            cached,
            duration_ms,
            timestamp,
            age: session.age,
            age_class: session.age_class(),
            session_id: session.session_id,
        }
    }
}
