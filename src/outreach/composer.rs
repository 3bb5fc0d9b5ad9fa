use crate::llm::{BestOfNEvaluator, ProviderKind};
use crate::outreach::collaborators::EmailComposer;
use crate::outreach::template;
use crate::outreach::types::{CandidateRecord, ComposedEmail, OutreachError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Prompt templates used by [`EvaluatedEmailComposer`].
///
/// Placeholders: `{student_info}`, `{identifier}`/`{name}`, `{contact}`,
/// `{queries}`, `{search_results}`, any record field, and `{body}` in the
/// subject prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerTemplates {
    pub body_prompt: String,
    pub body_criteria: String,
    pub subject_prompt: String,
}

impl Default for ComposerTemplates {
    fn default() -> Self {
        Self {
            body_prompt: "Write a concise, personalized outreach email from the student described \
                below to {name}. Refer specifically to their work using the research notes. \
                Do not include a subject line.\n\nStudent:\n{student_info}\n\nResearch notes:\n{search_results}"
                .to_string(),
            body_criteria: "Select the email that is most specific to the recipient's research, \
                professional in tone, and concise."
                .to_string(),
            subject_prompt: "Write a short, specific subject line for the following email. \
                Return only the subject line.\n\n{body}"
                .to_string(),
        }
    }
}

/// Composes the body through best-of-N selection and the subject through a
/// single generation.
pub struct EvaluatedEmailComposer {
    evaluator: Arc<BestOfNEvaluator>,
    templates: ComposerTemplates,
}

impl EvaluatedEmailComposer {
    pub fn new(evaluator: Arc<BestOfNEvaluator>, templates: ComposerTemplates) -> Self {
        Self {
            evaluator,
            templates,
        }
    }

    fn clean_subject(raw: &str) -> String {
        let line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
        let line = line
            .strip_prefix("Subject:")
            .or_else(|| line.strip_prefix("subject:"))
            .unwrap_or(line);
        line.trim().trim_matches('"').trim().to_string()
    }
}

#[async_trait]
impl EmailComposer for EvaluatedEmailComposer {
    async fn craft_email(
        &self,
        student_info: &str,
        record: &CandidateRecord,
        provider: ProviderKind,
    ) -> Result<ComposedEmail, OutreachError> {
        let mut values = record.template_values();
        values.insert("student_info".to_string(), student_info.to_string());

        let body_prompt = template::render(&self.templates.body_prompt, &values)?;
        let body = self
            .evaluator
            .generate_and_evaluate(&body_prompt, &self.templates.body_criteria, provider)
            .await?
            .trim()
            .to_string();

        values.insert("body".to_string(), body.clone());
        let subject_prompt = template::render(&self.templates.subject_prompt, &values)?;
        let raw_subject = self
            .evaluator
            .dispatcher()
            .generate(&subject_prompt, provider)
            .await?;
        let subject = Self::clean_subject(&raw_subject);

        debug!(identifier = %record.identifier, %subject, "Email composed");
        Ok(ComposedEmail { subject, body })
    }
}
