use crate::llm::ProviderKind;
use crate::outreach::collaborators::{
    EmailComposer, EmailScheduler, QueryGenerator, RecordStore, SearchExecutor,
};
use crate::outreach::schedule::{SendSchedule, stagger_minutes};
use crate::outreach::types::{
    BatchReport, CandidateRecord, OutboundEmail, OutreachError, PipelineStage, RecordFailure,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Per-run settings for [`OutreachPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub student_info: String,
    pub provider: ProviderKind,
    pub attachment_path: Option<PathBuf>,
    pub schedule: SendSchedule,
}

/// Collaborators the pipeline drives for each record.
pub struct PipelineParts {
    pub store: Arc<dyn RecordStore>,
    pub queries: Arc<dyn QueryGenerator>,
    pub search: Arc<dyn SearchExecutor>,
    pub composer: Arc<dyn EmailComposer>,
    pub scheduler: Arc<dyn EmailScheduler>,
}

/// Runs query generation, search, composition and scheduling over every
/// pending record. A failing record is reported and skipped; the batch goes
/// on.
pub struct OutreachPipeline {
    parts: PipelineParts,
    settings: PipelineSettings,
}

impl OutreachPipeline {
    pub fn new(parts: PipelineParts, settings: PipelineSettings) -> Self {
        Self { parts, settings }
    }

    pub async fn run(&self) -> Result<BatchReport, OutreachError> {
        let records = self.parts.store.load_pending().await?;
        let mut report = BatchReport::default();
        let mut scheduled_count = 0usize;

        for record in records {
            let identifier = record.identifier.clone();
            match self.process_record(record, scheduled_count + 1).await {
                Ok(_) => {
                    scheduled_count += 1;
                    info!(%identifier, "Record processed");
                    report.processed.push(identifier);
                }
                Err((stage, err)) => {
                    // A record that failed after scheduling still occupies a send slot.
                    if matches!(stage, PipelineStage::Store) {
                        scheduled_count += 1;
                    }
                    error!(%identifier, %stage, error = %err, "Record failed, continuing with batch");
                    report.failed.push(RecordFailure {
                        identifier,
                        stage,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            "Outreach batch finished"
        );
        Ok(report)
    }

    #[instrument(skip(self, record), fields(identifier = %record.identifier))]
    async fn process_record(
        &self,
        record: CandidateRecord,
        position: usize,
    ) -> Result<CandidateRecord, (PipelineStage, OutreachError)> {
        let record = self
            .parts
            .queries
            .generate_queries(record)
            .await
            .map_err(|e| (PipelineStage::Queries, e))?;

        let mut record = self
            .parts
            .search
            .perform_search(record)
            .await
            .map_err(|e| (PipelineStage::Search, e))?;

        let email = self
            .parts
            .composer
            .craft_email(&self.settings.student_info, &record, self.settings.provider)
            .await
            .map_err(|e| (PipelineStage::Compose, e))?;

        let outbound = OutboundEmail {
            contact: record.contact.clone(),
            email_body: email.body.clone(),
            subject: email.subject.clone(),
            attachment_path: self.settings.attachment_path.clone(),
            sent: false,
        };
        let at = self
            .settings
            .schedule
            .scheduled_time(stagger_minutes(position))
            .map_err(|e| (PipelineStage::Schedule, e))?;
        self.parts
            .scheduler
            .schedule(std::slice::from_ref(&outbound), at)
            .await
            .map_err(|e| (PipelineStage::Schedule, e))?;

        record.email_to_send = Some(email.full_content());
        record.sent = true;
        self.parts
            .store
            .update(&record)
            .await
            .map_err(|e| (PipelineStage::Store, e))?;

        Ok(record)
    }
}
