//! Client for the Gemini `generateContent` API.
//!
//! One prompt in, one block of generated text out. The report pipeline calls
//! this twice per run with different prompt templates (draft, then enhance).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use deepdraft_shared::{DeepDraftError, Result};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("deepdraft/", env!("CARGO_PKG_VERSION"));

/// Per-request HTTP timeout in seconds. Generation over a long prompt can
/// take a while, so this is more generous than the crawl poll timeout.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Wire types (generativelanguage.googleapis.com v1beta)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one Gemini model.
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client for `model` against `base_url`
    /// (e.g. `https://generativelanguage.googleapis.com`).
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DeepDraftError::config(format!("invalid Gemini base URL: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DeepDraftError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// The model this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text for a single prompt.
    ///
    /// Returns the concatenated text parts of the first candidate. No retry:
    /// any transport or API error surfaces immediately.
    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| DeepDraftError::config(format!("invalid model name: {e}")))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url.clone())
            // Key travels in a header so it never appears in URLs or logs.
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeepDraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let snippet = body_snippet(response).await;
            return Err(DeepDraftError::Generation(format!(
                "generateContent failed: HTTP {status}: {snippet}"
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DeepDraftError::Generation(format!("invalid response: {e}")))?;

        let text = extract_text(&parsed);
        if text.trim().is_empty() {
            return Err(DeepDraftError::Generation(
                "model returned no text (empty or blocked response)".into(),
            ));
        }

        debug!(response_len = text.len(), "generation complete");
        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Read at most the first 200 characters of an error response body.
async fn body_snippet(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body.trim().chars().take(200).collect(),
        Err(_) => "<unreadable body>".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
