//! Google Gemini `generateContent` backend.
//!
//! Wrapped by [`ProviderAdapter::gemini`], which retries transient failures
//! with exponential backoff.
//!
//! [`ProviderAdapter::gemini`]: crate::llm::ProviderAdapter::gemini

use crate::llm::provider::CompletionBackend;
use crate::llm::types::{BackendError, BackendSettings};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// HTTP client for `POST {base_url}/models/{model}:generateContent`.
///
/// The inner `reqwest::Client` is pooled and safe to share across tasks.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    settings: BackendSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, settings: BackendSettings) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(BackendError::from)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    fn endpoint(&self) -> Result<Url, BackendError> {
        let raw = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| BackendError::InvalidRequest(format!("bad Gemini endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    #[instrument(skip(self, prompt), fields(model = %self.settings.model))]
    async fn send(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self
                .settings
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), text));
        }

        let parsed: GenerateResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("response contained no candidates".to_string()))?;

        // Blocked prompts come back as a candidate without content.
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        debug!(response_chars = text.len(), "Gemini completion received");
        Ok(text)
    }
}

impl CompletionBackend for GeminiBackend {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(self.send(prompt))
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
