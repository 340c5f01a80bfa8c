//! Blocking transport to a generative model.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::AiError;

/// Default generateContent API root.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of a single completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The credential was rejected or is out of quota.
    #[error("credential rejected: {0}")]
    Credential(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

/// Sends one prompt with one credential and returns the model's text.
pub trait Transport: Send + Sync {
    fn complete(&self, credential: &str, prompt: &str) -> Result<String, TransportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// HTTP transport for the `generateContent` API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AiError::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn url(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{model}:generateContent", self.endpoint)
    }
}

impl Transport for HttpTransport {
    fn complete(&self, credential: &str, prompt: &str) -> Result<String, TransportError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };
        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", credential)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response.json().map_err(from_reqwest)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(TransportError::Other("model returned no text".to_string()));
        }
        Ok(text)
    }
}

fn from_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(error.to_string())
    }
}

const CREDENTIAL_MARKERS: &[&str] = &[
    "quota",
    "resource_exhausted",
    "permission_denied",
    "api key not valid",
    "api_key_invalid",
];

/// Decides whether a failed response is the credential's fault.
///
/// 401, 403 and 429 always are; other statuses are when the body reports a
/// quota, permission, or invalid-key error.
pub fn classify_failure(status: u16, body: &str) -> TransportError {
    let lowered = body.to_ascii_lowercase();
    let credential_body = CREDENTIAL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));
    if matches!(status, 401 | 403 | 429) || credential_body {
        TransportError::Credential(format!("status {status}"))
    } else {
        TransportError::Other(format!("status {status}"))
    }
}
