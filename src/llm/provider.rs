use crate::llm::retry::RetryPolicy;
use crate::llm::types::{BackendError, LLMError, ProviderKind};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Uniform "prompt in, text out" capability the dispatcher routes to.
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt, applying the provider's own retry policy.
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, LLMError>>;

    /// Which backend this generator talks to.
    fn provider_kind(&self) -> ProviderKind;
}

/// One raw upstream call with no retry or rate limiting.
///
/// Implementations must be safe for concurrent use; the HTTP backends share a
/// pooled `reqwest::Client`.
pub trait CompletionBackend: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>>;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;
}

/// Binds a backend to a provider identity and retry policy.
pub struct ProviderAdapter {
    kind: ProviderKind,
    backend: Arc<dyn CompletionBackend>,
    retry: RetryPolicy,
}

impl ProviderAdapter {
    pub fn new(kind: ProviderKind, backend: Arc<dyn CompletionBackend>, retry: RetryPolicy) -> Self {
        Self {
            kind,
            backend,
            retry,
        }
    }

    /// OpenAI: a single attempt, errors surface immediately.
    pub fn openai(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::new(ProviderKind::OpenAI, backend, RetryPolicy::none())
    }

    /// Gemini: exponential backoff over five attempts.
    pub fn gemini(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::new(ProviderKind::Gemini, backend, RetryPolicy::exponential())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

impl TextGenerator for ProviderAdapter {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, LLMError>> {
        Box::pin(async move {
            debug!(
                provider = %self.kind,
                model = self.backend.model(),
                prompt_chars = prompt.len(),
                "Calling provider"
            );

            self.retry
                .execute(self.kind, |_attempt| async move {
                    let text = self.backend.complete(prompt).await?;
                    if text.trim().is_empty() {
                        return Err(BackendError::EmptyResponse);
                    }
                    Ok(text)
                })
                .await
        })
    }

    fn provider_kind(&self) -> ProviderKind {
        self.kind
    }
}
