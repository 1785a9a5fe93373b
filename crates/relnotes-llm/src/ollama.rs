//! Local LLM provider speaking the Ollama `/api/generate` protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BackendError, BackendResult, LlmBackend};

/// Backend for a locally hosted model behind an Ollama-style HTTP API.
///
/// Unpaced by default; local endpoints impose no rate limits.
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
    pacing: Option<Duration>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    /// `api_url` is the full generate endpoint, e.g.
    /// `http://localhost:11434/api/generate`.
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            pacing: None,
        }
    }

    /// Force a pacing interval between sequential calls.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = (!interval.is_zero()).then_some(interval);
        self
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn pacing(&self) -> Option<Duration> {
        self.pacing
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "ollama generate");

        let response = self
            .client
            .post(&self.api_url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::MalformedResponse(format!("{e}: {body}")))?;
        Ok(parsed.response)
    }
}
