//! Contracts for the collaborators around the generation core.
//!
//! The pipeline only sees storage, search and delivery through these traits.
//! The built-in implementations cover local runs without any search or mail
//! provider.

use crate::llm::ProviderKind;
use crate::outreach::template;
use crate::outreach::types::{CandidateRecord, ComposedEmail, OutboundEmail, OutreachError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Source of candidate records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records whose `sent` flag is still false.
    async fn load_pending(&self) -> Result<Vec<CandidateRecord>, OutreachError>;

    /// Persist an updated record, matched by identifier.
    async fn update(&self, record: &CandidateRecord) -> Result<(), OutreachError>;
}

#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate_queries(
        &self,
        record: CandidateRecord,
    ) -> Result<CandidateRecord, OutreachError>;
}

#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn perform_search(&self, record: CandidateRecord)
    -> Result<CandidateRecord, OutreachError>;
}

/// Produces the subject and body for one record.
#[async_trait]
pub trait EmailComposer: Send + Sync {
    async fn craft_email(
        &self,
        student_info: &str,
        record: &CandidateRecord,
        provider: ProviderKind,
    ) -> Result<ComposedEmail, OutreachError>;
}

/// Hands messages to a delivery transport for sending at `at`.
#[async_trait]
pub trait EmailScheduler: Send + Sync {
    async fn schedule(
        &self,
        emails: &[OutboundEmail],
        at: DateTime<Utc>,
    ) -> Result<(), OutreachError>;
}

/// Fills predefined query templates from record fields.
pub struct TemplateQueryGenerator {
    templates: Vec<String>,
}

impl TemplateQueryGenerator {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl QueryGenerator for TemplateQueryGenerator {
    async fn generate_queries(
        &self,
        mut record: CandidateRecord,
    ) -> Result<CandidateRecord, OutreachError> {
        let values = record.template_values();
        record.queries = self
            .templates
            .iter()
            .map(|t| template::render(t, &values))
            .collect::<Result<_, _>>()?;
        debug!(
            identifier = %record.identifier,
            queries = record.queries.len(),
            "Queries generated"
        );
        Ok(record)
    }
}

/// Leaves records untouched; used when no search provider is configured.
pub struct NoopSearchExecutor;

#[async_trait]
impl SearchExecutor for NoopSearchExecutor {
    async fn perform_search(
        &self,
        record: CandidateRecord,
    ) -> Result<CandidateRecord, OutreachError> {
        debug!(identifier = %record.identifier, "Search skipped, no executor configured");
        Ok(record)
    }
}

/// Logs what would be sent and keeps it for inspection.
#[derive(Default)]
pub struct DryRunScheduler {
    scheduled: Mutex<Vec<(OutboundEmail, DateTime<Utc>)>>,
}

impl DryRunScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn scheduled(&self) -> Vec<(OutboundEmail, DateTime<Utc>)> {
        self.scheduled.lock().await.clone()
    }
}

#[async_trait]
impl EmailScheduler for DryRunScheduler {
    async fn schedule(
        &self,
        emails: &[OutboundEmail],
        at: DateTime<Utc>,
    ) -> Result<(), OutreachError> {
        let mut scheduled = self.scheduled.lock().await;
        for email in emails {
            info!(
                contact = %email.contact,
                subject = %email.subject,
                at = %at.to_rfc3339(),
                "Dry run: email would be scheduled"
            );
            scheduled.push((email.clone(), at));
        }
        Ok(())
    }
}
