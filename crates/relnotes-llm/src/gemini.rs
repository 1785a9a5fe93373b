//! Google Gemini provider via the `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BackendError, BackendResult, LlmBackend};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default pacing between Gemini calls; the free tier enforces a low
/// requests-per-minute quota.
pub const DEFAULT_GEMINI_PACING: Duration = Duration::from_secs(2);

/// Backend for the Google Gemini API.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    pacing: Option<Duration>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            pacing: Some(DEFAULT_GEMINI_PACING),
        }
    }

    /// Override the API origin (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the pacing interval; zero disables pacing.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = (!interval.is_zero()).then_some(interval);
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn pacing(&self) -> Option<Duration> {
        self.pacing
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "gemini generate");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
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

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::MalformedResponse(format!("{e}: {body}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::MalformedResponse("no candidates".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.is_empty() {
            return Err(BackendError::MalformedResponse(
                "candidate carried no text parts".to_string(),
            ));
        }
        Ok(text)
    }
}
