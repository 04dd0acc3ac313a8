mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::Completion;
use client::ClaudeClient;
use types::*;

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: Duration::from_secs(10),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }
}

#[async_trait]
impl Completion for Claude {
    fn provider(&self) -> &'static str {
        "claude"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user(prompt))
            .max_tokens(16)
            .temperature(0.0);

        let client = self.client();
        let response = tokio::time::timeout(self.timeout, client.chat(&request))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))??;

        response.text().ok_or(AiError::EmptyResponse("claude"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use tokio_test::assert_ok;

    #[test]
    fn test_claude_with_base_url() {
        let ai = Claude::new("sk-ant-test", DEFAULT_MODEL).with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
        assert_eq!(ai.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_complete_sends_api_key_and_returns_text() {
        let app = Router::new().route(
            "/messages",
            post(|headers: HeaderMap| async move {
                let key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let answer = if key == "sk-ant-test" { "SAFE" } else { "wrong key" };
                Json(serde_json::json!({
                    "content": [{"type": "text", "text": answer}]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let ai = Claude::new("sk-ant-test", DEFAULT_MODEL).with_base_url(format!("http://{addr}"));
        let answer = assert_ok!(ai.complete("classify").await);
        assert_eq!(answer, "SAFE");
    }
}
