//! Threat-intelligence lookup (Google Safe Browsing v4).
//!
//! Latency-bounded and fail-open: any failure reads as "no threat found".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);
pub const UNSAFE_SITE_REASON: &str = "Unsafe site (phishing or malware detected)";

const THREAT_TYPES: &[&str] = &[
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error("no API key configured")]
    MissingKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ReputationError {
    fn from(err: reqwest::Error) -> Self {
        ReputationError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ReputationError {
    fn from(err: serde_json::Error) -> Self {
        ReputationError::Parse(err.to_string())
    }
}

/// Reputation lookup over a canonical URL. Returns the block reason when the
/// URL is flagged.
#[async_trait]
pub trait ReputationCheck: Send + Sync {
    async fn check(&self, url: &str) -> Option<String>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    client: ClientInfo,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo {
    client_id: &'static str,
    client_version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'static [&'static str],
    platform_types: [&'static str; 1],
    threat_entry_types: [&'static str; 1],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct FindResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    #[serde(default)]
    pub threat_type: String,
    #[serde(default)]
    pub platform_type: String,
}

impl<'a> FindRequest<'a> {
    fn for_url(url: &'a str) -> Self {
        Self {
            client: ClientInfo {
                client_id: "weblante",
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ThreatInfo {
                threat_types: THREAT_TYPES,
                platform_types: ["ANY_PLATFORM"],
                threat_entry_types: ["URL"],
                threat_entries: [ThreatEntry { url }],
            },
        }
    }
}

// --- Client ---

pub struct SafeBrowsingClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl SafeBrowsingClient {
    /// A client without a key is valid; every lookup then fails open.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Threat matches for `url`, bounded by the configured timeout.
    pub async fn lookup(&self, url: &str) -> Result<Vec<ThreatMatch>, ReputationError> {
        let key = self.api_key.as_deref().ok_or(ReputationError::MissingKey)?;

        tokio::time::timeout(self.timeout, self.send(key, url))
            .await
            .map_err(|_| ReputationError::Timeout(self.timeout))?
    }

    async fn send(&self, key: &str, url: &str) -> Result<Vec<ThreatMatch>, ReputationError> {
        let entry = with_scheme(url);
        debug!(url = %entry, "Safe Browsing lookup");

        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("key", key)])
            .json(&FindRequest::for_url(&entry))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ReputationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.bytes().await?;
        let parsed: FindResponse = serde_json::from_slice(&body)?;
        Ok(parsed.matches)
    }
}

/// Threat entries must be absolute URLs; canonical forms carry no scheme.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[async_trait]
impl ReputationCheck for SafeBrowsingClient {
    async fn check(&self, url: &str) -> Option<String> {
        match self.lookup(url).await {
            Ok(matches) if !matches.is_empty() => {
                let types: Vec<&str> = matches.iter().map(|m| m.threat_type.as_str()).collect();
                warn!(url, threats = ?types, "Safe Browsing flagged URL");
                Some(UNSAFE_SITE_REASON.to_string())
            }
            Ok(_) => None,
            Err(ReputationError::MissingKey) => {
                debug!("Safe Browsing key not configured, skipping lookup");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Safe Browsing lookup failed, allowing");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/find")
    }

    #[test]
    fn test_request_manifest() {
        let body = serde_json::to_value(FindRequest::for_url("http://bad.example/")).unwrap();
        assert_eq!(body["threatInfo"]["threatTypes"].as_array().unwrap().len(), 4);
        assert_eq!(body["threatInfo"]["platformTypes"], json!(["ANY_PLATFORM"]));
        assert_eq!(body["threatInfo"]["threatEntryTypes"], json!(["URL"]));
        assert_eq!(body["threatInfo"]["threatEntries"][0]["url"], "http://bad.example/");
        assert_eq!(body["client"]["clientId"], "weblante");
    }

    #[tokio::test]
    async fn test_match_blocks() {
        let app = Router::new().route(
            "/find",
            post(|Json(body): Json<Value>| async move {
                let url = body["threatInfo"]["threatEntries"][0]["url"].clone();
                Json(json!({
                    "matches": [{
                        "threatType": "SOCIAL_ENGINEERING",
                        "platformType": "ANY_PLATFORM",
                        "threat": { "url": url }
                    }]
                }))
            }),
        );
        let client = SafeBrowsingClient::new(Some("k".into())).with_endpoint(serve(app).await);

        let matches = client.lookup("http://phish.example/").await.unwrap();
        assert_eq!(matches[0].threat_type, "SOCIAL_ENGINEERING");
        assert_eq!(
            client.check("http://phish.example/").await.as_deref(),
            Some(UNSAFE_SITE_REASON)
        );
    }

    #[tokio::test]
    async fn test_canonical_url_gets_scheme() {
        let app = Router::new().route(
            "/find",
            post(|Json(body): Json<Value>| async move {
                let url = body["threatInfo"]["threatEntries"][0]["url"].clone();
                if url == "http://example.com/reset" {
                    Json(json!({ "matches": [{ "threatType": "MALWARE" }] }))
                } else {
                    Json(json!({}))
                }
            }),
        );
        let client = SafeBrowsingClient::new(Some("k".into())).with_endpoint(serve(app).await);

        assert_eq!(
            client.check("example.com/reset").await.as_deref(),
            Some(UNSAFE_SITE_REASON)
        );
        assert_eq!(with_scheme("https://example.com/"), "https://example.com/");
    }

    #[tokio::test]
    async fn test_empty_body_is_clean() {
        let app = Router::new().route("/find", post(|| async { Json(json!({})) }));
        let client = SafeBrowsingClient::new(Some("k".into())).with_endpoint(serve(app).await);
        assert_eq!(client.check("https://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_non_success_fails_open() {
        let app = Router::new().route(
            "/find",
            post(|| async { (StatusCode::FORBIDDEN, "quota exceeded") }),
        );
        let client = SafeBrowsingClient::new(Some("k".into())).with_endpoint(serve(app).await);

        let err = client.lookup("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ReputationError::Api { status: 403, .. }));
        assert_eq!(client.check("https://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_malformed_body_fails_open() {
        let app = Router::new().route("/find", post(|| async { "not json" }));
        let client = SafeBrowsingClient::new(Some("k".into())).with_endpoint(serve(app).await);

        let err = client.lookup("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ReputationError::Parse(_)));
        assert_eq!(client.check("https://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_missing_key_fails_open() {
        let client = SafeBrowsingClient::new(Some("   ".into()));
        assert!(!client.is_configured());
        assert!(matches!(
            client.lookup("https://example.com/").await,
            Err(ReputationError::MissingKey)
        ));
        assert_eq!(client.check("https://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_fails_open() {
        let client = SafeBrowsingClient::new(Some("k".into()))
            .with_endpoint("http://127.0.0.1:9/find")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(client.check("https://example.com/").await, None);
    }
}
