//! Text-completion contract

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Output of a single completion call, with usage statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Generation {
    /// Generated text
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Total tokens divided by wall-clock time of the call
    pub tokens_per_second: f64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Generation {
    /// A generation carrying only text, for backends without usage data
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Fill in token counts and derive throughput from the elapsed time
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64, elapsed: Duration) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self.total_tokens = prompt_tokens + completion_tokens;
        self.elapsed = elapsed;
        let secs = elapsed.as_secs_f64();
        self.tokens_per_second = if secs > 0.0 {
            self.total_tokens as f64 / secs
        } else {
            0.0
        };
        self
    }
}

/// A text-completion service behind a single `generate` call.
///
/// Errors are transport or authentication failures. Callers that want retries
/// wrap the model themselves.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, used for logging
    fn name(&self) -> &str;

    /// Complete a prompt
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}
