use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// Completion Trait
// =============================================================================

/// A single-turn text completion against a hosted language model.
///
/// Implementations enforce their own request timeout so callers on a
/// latency-sensitive path never wait longer than the configured bound.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Provider name, used in logs.
    fn provider(&self) -> &'static str;

    /// Send `prompt` as a single user turn and return the raw text answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
