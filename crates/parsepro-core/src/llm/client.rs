use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prompts::EXTRACTION_PROMPT;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Credential missing or rejected: {0}")]
    Auth(String),
    #[error("Upstream service failure: {0}")]
    Upstream(String),
    #[error("No response within the configured wait")]
    Timeout,
}

pub type SummaryResult<T> = Result<T, SummaryError>;

/// Transport seam to the external structured-extraction service. The
/// reply is opaque text; parsing it is the normalizer's job.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn request_summary(&self, text: &str, credential: &str) -> SummaryResult<String>;
}

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Client for the Gemini `generateContent` API.
///
/// One request per entry, no internal retry: retry policy belongs to the
/// caller so per-entry isolation in a batch is preserved. The credential
/// travels only in the `x-goog-api-key` header and is never logged.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StructuredExtractor for GeminiClient {
    async fn request_summary(&self, text: &str, credential: &str) -> SummaryResult<String> {
        if credential.trim().is_empty() {
            return Err(SummaryError::Auth("no API credential supplied".into()));
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{EXTRACTION_PROMPT}{text}"),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SummaryError::Auth(format!(
                "service rejected the credential ({status})"
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(SummaryError::Upstream(format!("{status}: {message}")));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Upstream(format!("unreadable reply: {e}")))?;

        if let Some(error) = reply.error {
            return Err(SummaryError::Upstream(error.message));
        }

        reply
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| SummaryError::Upstream("reply contained no text".into()))
    }
}

fn classify_transport(error: reqwest::Error) -> SummaryError {
    if error.is_timeout() {
        SummaryError::Timeout
    } else {
        SummaryError::Upstream(error.to_string())
    }
}
