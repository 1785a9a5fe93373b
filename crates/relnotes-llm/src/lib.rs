//! LLM backend capability layer for relnotes.
//!
//! Defines the provider-agnostic [`LlmBackend`] trait (a stateless
//! `generate(prompt) -> text` capability), the [`BackendError`] taxonomy,
//! and two concrete providers: a local Ollama-style HTTP endpoint and the
//! Google Gemini API. Provider selection happens at construction time;
//! orchestration code upstream only ever sees the trait.
//!
//! Rate pacing is a property of the backend, not of the caller: a backend
//! that needs breathing room between calls reports it via
//! [`LlmBackend::pacing`], and callers sleep between sequential calls.

use std::time::Duration;

use async_trait::async_trait;

pub mod fakes;
pub mod gemini;
pub mod ollama;
pub mod retry;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use retry::{with_retries, RetryPolicy};

/// Errors produced by backend invocations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("backend call timed out after {0} seconds")]
    Timeout(u64),

    /// Carries the final attempt's error so callers can still tell what
    /// kind of failure exhausted the budget.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<BackendError> },
}

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A stateless text-generation capability.
///
/// One call, one prompt, one completion. Implementations hold whatever
/// connection state they need (an HTTP client, credentials) but no
/// conversation state; every call is independent.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short provider name for logs and reports.
    fn name(&self) -> &str;

    /// Minimum delay between successive calls, or `None` when the backend
    /// tolerates back-to-back requests.
    fn pacing(&self) -> Option<Duration> {
        None
    }

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> BackendResult<String>;
}

#[async_trait]
impl<B: LlmBackend + ?Sized> LlmBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn pacing(&self) -> Option<Duration> {
        (**self).pacing()
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<B: LlmBackend + ?Sized> LlmBackend for std::sync::Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn pacing(&self) -> Option<Duration> {
        (**self).pacing()
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        (**self).generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::Status {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));

        let err = BackendError::Timeout(120);
        assert!(err.to_string().contains("120"));
    }

    #[tokio::test]
    async fn boxed_backend_delegates() {
        let backend: Box<dyn LlmBackend> = Box::new(fakes::EchoBackend::new());
        assert_eq!(backend.name(), "echo");
        assert_eq!(backend.generate("ping").await.unwrap(), "ping");
    }
}
