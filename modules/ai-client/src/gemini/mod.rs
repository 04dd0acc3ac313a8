mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::Completion;
use client::GeminiClient;
use types::GenerateContentRequest;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl Gemini {
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

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }
}

#[async_trait]
impl Completion for Gemini {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest::user_text(prompt)
            .temperature(0.0)
            .max_output_tokens(16);

        let client = self.client();
        let response = tokio::time::timeout(self.timeout, client.generate(&self.model, &request))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))??;

        response.text().ok_or(AiError::EmptyResponse("gemini"))
    }
}
