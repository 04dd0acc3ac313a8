use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    Claude,
}

impl FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "claude" | "anthropic" => Ok(AiProvider::Claude),
            other => Err(anyhow!("unknown AI provider: {other}")),
        }
    }
}

/// What the AI classifier answers when it cannot produce a verdict
/// (timeout, transport error, unparseable response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierFailurePolicy {
    /// Treat as SAFE.
    Open,
    /// Treat as UNSAFE.
    Closed,
}

impl FromStr for ClassifierFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "fail-open" | "fail_open" => Ok(ClassifierFailurePolicy::Open),
            "closed" | "fail-closed" | "fail_closed" => Ok(ClassifierFailurePolicy::Closed),
            other => Err(anyhow!("unknown classifier failure policy: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Reputation
    pub safe_browsing_key: Option<String>,
    pub safe_browsing_url: Option<String>,
    pub reputation_timeout: Duration,

    // AI classifier
    pub ai_provider: AiProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub anthropic_api_key: Option<String>,
    pub claude_model: String,
    pub classifier_timeout: Duration,
    pub classifier_failure_policy: ClassifierFailurePolicy,

    // Pipeline
    pub decision_deadline: Duration,
    pub enable_link_security: bool,

    // Session
    pub child_age: Option<u8>,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safe_browsing_key: None,
            safe_browsing_url: None,
            reputation_timeout: Duration::from_millis(200),
            ai_provider: AiProvider::Gemini,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            anthropic_api_key: None,
            claude_model: "claude-haiku-4-5-20251001".to_string(),
            classifier_timeout: Duration::from_millis(3000),
            classifier_failure_policy: ClassifierFailurePolicy::Closed,
            decision_deadline: Duration::from_millis(5000),
            enable_link_security: false,
            child_age: None,
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    /// Every variable is optional; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            safe_browsing_key: get("SAFE_BROWSING_KEY"),
            safe_browsing_url: get("SAFE_BROWSING_URL"),
            reputation_timeout: parse_millis(get("REPUTATION_TIMEOUT_MS"), "REPUTATION_TIMEOUT_MS")?
                .unwrap_or(defaults.reputation_timeout),
            ai_provider: parse(get("AI_PROVIDER"), "AI_PROVIDER")?.unwrap_or(defaults.ai_provider),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("GEMINI_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            claude_model: get("CLAUDE_MODEL").unwrap_or(defaults.claude_model),
            classifier_timeout: parse_millis(get("CLASSIFIER_TIMEOUT_MS"), "CLASSIFIER_TIMEOUT_MS")?
                .unwrap_or(defaults.classifier_timeout),
            classifier_failure_policy: parse(
                get("CLASSIFIER_FAILURE_POLICY"),
                "CLASSIFIER_FAILURE_POLICY",
            )?
            .unwrap_or(defaults.classifier_failure_policy),
            decision_deadline: parse_millis(get("DECISION_DEADLINE_MS"), "DECISION_DEADLINE_MS")?
                .unwrap_or(defaults.decision_deadline),
            enable_link_security: parse(get("ENABLE_LINK_SECURITY"), "ENABLE_LINK_SECURITY")?
                .unwrap_or(defaults.enable_link_security),
            child_age: parse(get("CHILD_AGE"), "CHILD_AGE")?,
            web_host: get("WEB_HOST").unwrap_or(defaults.web_host),
            web_port: parse(get("WEB_PORT"), "WEB_PORT")?.unwrap_or(defaults.web_port),
        };

        Ok(config)
    }

    /// API key for the selected AI provider, if configured.
    pub fn classifier_api_key(&self) -> Option<&str> {
        match self.ai_provider {
            AiProvider::Gemini => self.gemini_api_key.as_deref(),
            AiProvider::Claude => self.anthropic_api_key.as_deref(),
        }
    }

    pub fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.char_indices().nth(5).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  SAFE_BROWSING_KEY: {}", preview_opt(&self.safe_browsing_key));
        tracing::info!("  AI_PROVIDER: {:?}", self.ai_provider);
        tracing::info!("  GEMINI_API_KEY: {}", preview_opt(&self.gemini_api_key));
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview_opt(&self.anthropic_api_key));
        tracing::info!(
            "  CLASSIFIER_FAILURE_POLICY: {:?}",
            self.classifier_failure_policy
        );
        tracing::info!("  CHILD_AGE: {:?}", self.child_age);
    }
}

fn parse<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow!("{e}"))
                .with_context(|| format!("{key} has an invalid value: {v}"))
        })
        .transpose()
}

fn parse_millis(value: Option<String>, key: &str) -> Result<Option<Duration>> {
    Ok(parse::<u64>(value, key)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.reputation_timeout, Duration::from_millis(200));
        assert_eq!(config.classifier_failure_policy, ClassifierFailurePolicy::Closed);
        assert_eq!(config.ai_provider, AiProvider::Gemini);
        assert_eq!(config.web_port, 3000);
        assert!(config.child_age.is_none());
        assert!(!config.enable_link_security);
    }

    #[test]
    fn test_reads_values() {
        let config = Config::from_lookup(lookup(&[
            ("CHILD_AGE", "11"),
            ("AI_PROVIDER", "claude"),
            ("ANTHROPIC_API_KEY", "sk-ant-x"),
            ("CLASSIFIER_FAILURE_POLICY", "open"),
            ("REPUTATION_TIMEOUT_MS", "150"),
            ("ENABLE_LINK_SECURITY", "true"),
        ]))
        .unwrap();
        assert_eq!(config.child_age, Some(11));
        assert_eq!(config.ai_provider, AiProvider::Claude);
        assert_eq!(config.classifier_api_key(), Some("sk-ant-x"));
        assert_eq!(config.classifier_failure_policy, ClassifierFailurePolicy::Open);
        assert_eq!(config.reputation_timeout, Duration::from_millis(150));
        assert!(config.enable_link_security);
    }

    #[test]
    fn test_legacy_gemini_key_name() {
        let config = Config::from_lookup(lookup(&[("GEMINI_KEY", "g-123")])).unwrap();
        assert_eq!(config.classifier_api_key(), Some("g-123"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[("CHILD_AGE", "  "), ("SAFE_BROWSING_KEY", "")])).unwrap();
        assert!(config.child_age.is_none());
        assert!(config.safe_browsing_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("CHILD_AGE", "twelve")])).is_err());
        assert!(Config::from_lookup(lookup(&[("WEB_PORT", "99999")])).is_err());
        assert!(Config::from_lookup(lookup(&[("AI_PROVIDER", "palm")])).is_err());
    }
}
