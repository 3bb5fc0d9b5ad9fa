//! OpenAI chat-completions backend.
//!
//! Wrapped by [`ProviderAdapter::openai`], which performs a single attempt per
//! request.
//!
//! [`ProviderAdapter::openai`]: crate::llm::ProviderAdapter::openai

use crate::llm::provider::CompletionBackend;
use crate::llm::types::{BackendError, BackendSettings};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// HTTP client for `POST {base_url}/chat/completions`.
///
/// The inner `reqwest::Client` is pooled and safe to share across tasks.
pub struct OpenAIBackend {
    client: Client,
    api_key: String,
    settings: BackendSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIBackend {
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

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    #[instrument(skip(self, prompt), fields(model = %self.settings.model))]
    async fn send(&self, prompt: &str) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Malformed("response contained no choices".to_string()))?;

        debug!(response_chars = content.len(), "OpenAI completion received");
        Ok(content)
    }
}

impl CompletionBackend for OpenAIBackend {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(self.send(prompt))
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
