use crate::llm::dispatcher::GenerationDispatcher;
use crate::llm::types::{EvaluationRequest, LLMError, ProviderKind};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How candidates are produced and how the selection is treated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Issue the candidate generations concurrently instead of one by one.
    pub concurrent_candidates: bool,
    /// Map the selection back onto a candidate when it matches one.
    pub verify_selection: bool,
}

/// Best-of-N selection: several candidates, then one judging call.
pub struct BestOfNEvaluator {
    dispatcher: Arc<GenerationDispatcher>,
    config: EvaluationConfig,
}

impl BestOfNEvaluator {
    pub fn new(dispatcher: Arc<GenerationDispatcher>, config: EvaluationConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn dispatcher(&self) -> &Arc<GenerationDispatcher> {
        &self.dispatcher
    }

    /// Generate the candidates for `prompt` and return the one the backend
    /// judges best under `criteria`.
    ///
    /// Any candidate failure aborts the whole evaluation with that error.
    pub async fn generate_and_evaluate(
        &self,
        prompt: &str,
        criteria: &str,
        provider: ProviderKind,
    ) -> Result<String, LLMError> {
        self.evaluate(&EvaluationRequest::new(prompt, criteria, provider))
            .await
    }

    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<String, LLMError> {
        if !self.dispatcher.has_provider(request.provider) {
            return Err(LLMError::InvalidProvider(request.provider.to_string()));
        }

        let candidates = self.generate_candidates(request).await?;
        info!(
            provider = %request.provider,
            candidates = candidates.len(),
            "Candidates generated, requesting selection"
        );

        let selection = self
            .dispatcher
            .execute(&request.selection_request(&candidates))
            .await?;

        if self.config.verify_selection {
            Ok(Self::reconcile(selection, &candidates))
        } else {
            Ok(selection)
        }
    }

    async fn generate_candidates(&self, request: &EvaluationRequest) -> Result<Vec<String>, LLMError> {
        let requests = request.candidate_requests();

        if self.config.concurrent_candidates {
            // try_join_all keeps input order and stops at the first error.
            return try_join_all(requests.iter().map(|req| self.dispatcher.execute(req))).await;
        }

        let mut candidates = Vec::with_capacity(requests.len());
        for (index, req) in requests.iter().enumerate() {
            let text = self.dispatcher.execute(req).await.inspect_err(|err| {
                warn!(
                    provider = %request.provider,
                    candidate = index + 1,
                    error = %err,
                    "Candidate generation failed, aborting evaluation"
                );
            })?;
            debug!(candidate = index + 1, chars = text.len(), "Candidate generated");
            candidates.push(text);
        }
        Ok(candidates)
    }

    fn reconcile(selection: String, candidates: &[String]) -> String {
        let wanted = selection.trim();
        match candidates.iter().find(|c| c.trim() == wanted) {
            Some(candidate) => candidate.clone(),
            None => {
                warn!("Selected text does not match any candidate verbatim");
                selection
            }
        }
    }
}
