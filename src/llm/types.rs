use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Number of independent candidates generated for a best-of-N evaluation.
pub const CANDIDATE_COUNT: usize = 3;

/// Supported generative-text backends.
///
/// `OpenAI` is the "no built-in retry" provider, `Gemini` retries transient
/// failures with exponential backoff.
///
/// Deserialization accepts every selector [`FromStr`] does, so model names
/// such as `gemini-pro` work in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ProviderKind {
    OpenAI,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAI, ProviderKind::Gemini];

    /// Name of the credential entry holding this provider's secret.
    pub fn credential_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => crate::env::credentials::OPENAI_API_KEY,
            ProviderKind::Gemini => crate::env::credentials::GEMINI_API_KEY,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => crate::env::providers::OPENAI_DEFAULT_MODEL,
            ProviderKind::Gemini => crate::env::providers::GEMINI_DEFAULT_MODEL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt-3.5-turbo" | "gpt-3.5-turbo-1106" => Ok(ProviderKind::OpenAI),
            "gemini" | "gemini-pro" => Ok(ProviderKind::Gemini),
            _ => Err(LLMError::InvalidProvider(s.to_string())),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = LLMError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single prompt routed to one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub provider: ProviderKind,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            prompt: prompt.into(),
            provider,
        }
    }
}

/// A best-of-N request: candidates for `prompt`, judged against `criteria`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub prompt: String,
    pub criteria: String,
    pub provider: ProviderKind,
}

impl EvaluationRequest {
    pub fn new(
        prompt: impl Into<String>,
        criteria: impl Into<String>,
        provider: ProviderKind,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            criteria: criteria.into(),
            provider,
        }
    }

    /// The identical candidate requests issued before selection.
    pub fn candidate_requests(&self) -> Vec<GenerationRequest> {
        (0..CANDIDATE_COUNT)
            .map(|_| GenerationRequest::new(self.prompt.clone(), self.provider))
            .collect()
    }

    /// The selection request embedding the criteria and every candidate.
    pub fn selection_request(&self, candidates: &[String]) -> GenerationRequest {
        GenerationRequest::new(
            build_evaluation_prompt(&self.criteria, candidates),
            self.provider,
        )
    }
}

/// Renders the prompt asking a backend to return the best candidate verbatim.
///
/// Candidates are listed in generation order and labeled `1.`, `2.`, ...
pub fn build_evaluation_prompt(criteria: &str, candidates: &[String]) -> String {
    let mut prompt = format!(
        "Based on the following criteria: {criteria}, evaluate the {count} responses provided below. \
         Return the complete text of the best response verbatim, but without including any \
         preceding labels such as 'Response 1.' and without any added commentary. \
         Response options:",
        count = candidates.len()
    );
    for (index, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("\n{}. {}", index + 1, candidate));
    }
    prompt
}

/// Rolling-window quota applied before every dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60),
        }
    }
}

/// Errors surfaced by the generation layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Failed to load credentials: {0}")]
    CredentialLoad(String),
    #[error("Invalid provider '{0}'. Choose 'gpt-3.5-turbo' or 'gemini-pro'")]
    InvalidProvider(String),
    #[error("{provider} request failed after {attempts} attempt(s): {message}")]
    Provider {
        provider: ProviderKind,
        attempts: u32,
        message: String,
    },
}

impl LLMError {
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            LLMError::Provider { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

/// Failure of a single raw backend call, before any retry decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Empty response from provider")]
    EmptyResponse,
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Authentication(_) | BackendError::InvalidRequest(_) => false,
            BackendError::RateLimited(_)
            | BackendError::Network(_)
            | BackendError::Malformed(_)
            | BackendError::EmptyResponse => true,
            BackendError::Status { status, .. } => *status >= 500,
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => BackendError::Authentication(body),
            429 => BackendError::RateLimited(body),
            400 | 404 | 422 => BackendError::InvalidRequest(body),
            _ => BackendError::Status { status, body },
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        // Gemini carries the API key in the query string.
        let error = error.without_url();
        if error.is_decode() {
            BackendError::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            BackendError::from_status(status.as_u16(), error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }
}

/// Connection settings for one HTTP backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
}

impl BackendSettings {
    pub fn for_provider(kind: ProviderKind) -> Self {
        let base_url = match kind {
            ProviderKind::OpenAI => crate::env::providers::OPENAI_BASE_URL,
            ProviderKind::Gemini => crate::env::providers::GEMINI_BASE_URL,
        };
        Self {
            model: kind.default_model().to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(crate::env::providers::DEFAULT_TIMEOUT_SECS),
            temperature: None,
        }
    }
}
