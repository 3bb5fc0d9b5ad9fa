use crate::credentials::Credentials;
use crate::llm::gemini_provider::GeminiBackend;
use crate::llm::openai_provider::OpenAIBackend;
use crate::llm::provider::{ProviderAdapter, TextGenerator};
use crate::llm::rate_limiter::SlidingWindowLimiter;
use crate::llm::retry::RetryPolicy;
use crate::llm::types::{BackendSettings, GenerationRequest, LLMError, ProviderKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Per-provider construction settings for [`GenerationDispatcher::from_credentials`].
#[derive(Debug, Clone)]
pub struct ProviderSetup {
    pub backend: BackendSettings,
    pub retry: RetryPolicy,
}

impl ProviderSetup {
    pub fn default_for(kind: ProviderKind) -> Self {
        let retry = match kind {
            ProviderKind::OpenAI => RetryPolicy::none(),
            ProviderKind::Gemini => RetryPolicy::exponential(),
        };
        Self {
            backend: BackendSettings::for_provider(kind),
            retry,
        }
    }
}

/// Routes prompts to provider adapters behind a shared rate limiter.
///
/// Provider resolution happens before a slot is acquired, so an unknown or
/// unregistered provider never blocks. Only successful calls are recorded
/// against the quota.
pub struct GenerationDispatcher {
    limiter: Arc<SlidingWindowLimiter>,
    providers: HashMap<ProviderKind, Arc<dyn TextGenerator>>,
}

impl GenerationDispatcher {
    pub fn new(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            limiter,
            providers: HashMap::new(),
        }
    }

    /// Register (or replace) the generator used for its provider kind.
    pub fn with_provider(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.providers.insert(generator.provider_kind(), generator);
        self
    }

    /// Build both HTTP-backed adapters from loaded credentials.
    pub fn from_credentials(
        credentials: &Credentials,
        limiter: Arc<SlidingWindowLimiter>,
        mut setups: HashMap<ProviderKind, ProviderSetup>,
    ) -> Result<Self, LLMError> {
        let mut dispatcher = Self::new(limiter);

        for kind in ProviderKind::ALL {
            let setup = setups
                .remove(&kind)
                .unwrap_or_else(|| ProviderSetup::default_for(kind));
            let secret = credentials.secret_for(kind).ok_or_else(|| {
                LLMError::CredentialLoad(format!("missing key {}", kind.credential_key()))
            })?;
            let init_error = |e: crate::llm::BackendError| LLMError::Provider {
                provider: kind,
                attempts: 0,
                message: format!("failed to initialise client: {e}"),
            };

            let adapter = match kind {
                ProviderKind::OpenAI => ProviderAdapter::openai(Arc::new(
                    OpenAIBackend::new(secret, setup.backend).map_err(init_error)?,
                )),
                ProviderKind::Gemini => ProviderAdapter::gemini(Arc::new(
                    GeminiBackend::new(secret, setup.backend).map_err(init_error)?,
                )),
            }
            .with_retry_policy(setup.retry);

            dispatcher = dispatcher.with_provider(Arc::new(adapter));
        }

        Ok(dispatcher)
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Rate-limited generation against the chosen provider.
    pub async fn generate(&self, prompt: &str, provider: ProviderKind) -> Result<String, LLMError> {
        let generator = self
            .providers
            .get(&provider)
            .ok_or_else(|| LLMError::InvalidProvider(provider.to_string()))?;

        let permit = self.limiter.acquire().await;
        debug!(%provider, permit_id = %permit.permit_id, "Dispatching generation request");

        match generator.generate(prompt).await {
            Ok(text) => {
                permit.commit();
                Ok(text)
            }
            Err(err) => {
                // The permit is dropped uncommitted, returning the slot.
                error!(%provider, error = %err, "Generation request failed");
                Err(err)
            }
        }
    }

    /// Like [`generate`](Self::generate), with a free-form provider selector
    /// such as `"gemini-pro"` or `"gpt-3.5-turbo"`.
    pub async fn generate_named(&self, prompt: &str, selector: &str) -> Result<String, LLMError> {
        let provider: ProviderKind = selector.parse()?;
        self.generate(prompt, provider).await
    }

    pub async fn execute(&self, request: &GenerationRequest) -> Result<String, LLMError> {
        self.generate(&request.prompt, request.provider).await
    }
}
