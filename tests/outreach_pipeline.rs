use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use reachout::llm::{
    BestOfNEvaluator, EvaluationConfig, GenerationDispatcher, LLMError, ProviderKind,
    RateLimitConfig, SlidingWindowLimiter, TextGenerator,
};
use reachout::outreach::{
    CandidateRecord, ComposedEmail, ComposerTemplates, DryRunScheduler, EmailComposer,
    EvaluatedEmailComposer, JsonRecordStore, NoopSearchExecutor, OutreachError, OutreachPipeline,
    PipelineParts, PipelineSettings, PipelineStage, RecordStore, SendSchedule,
    TemplateQueryGenerator,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Composer that refuses records whose identifier is listed.
struct SelectiveComposer {
    reject: Vec<String>,
}

#[async_trait]
impl EmailComposer for SelectiveComposer {
    async fn craft_email(
        &self,
        student_info: &str,
        record: &CandidateRecord,
        _provider: ProviderKind,
    ) -> Result<ComposedEmail, OutreachError> {
        if self.reject.contains(&record.identifier) {
            return Err(OutreachError::Generation(LLMError::Provider {
                provider: ProviderKind::Gemini,
                attempts: 5,
                message: "upstream unavailable".to_string(),
            }));
        }
        Ok(ComposedEmail {
            subject: format!("Inquiry for {}", record.identifier),
            body: format!("{} | {}", student_info, record.queries.join(";")),
        })
    }
}

/// Generator answering candidate, selection and subject prompts.
struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
}

impl TextGenerator for ScriptedGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, LLMError>> {
        Box::pin(async move {
            let count = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt.to_string());
                prompts.len()
            };
            let reply = if prompt.starts_with("Based on the following criteria") {
                "Dear Dr. Ada, draft 2".to_string()
            } else if prompt.starts_with("Write a short, specific subject line") {
                "Subject: \"Research assistant inquiry\"".to_string()
            } else {
                format!("Dear Dr. Ada, draft {count}")
            };
            Ok(reply)
        })
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }
}

fn write_records(dir: &TempDir, records: &[CandidateRecord]) -> PathBuf {
    let path = dir.path().join("records.json");
    std::fs::write(&path, serde_json::to_string_pretty(records).unwrap()).unwrap();
    path
}

fn fixed_schedule() -> SendSchedule {
    SendSchedule {
        date: NaiveDate::from_ymd_opt(2024, 1, 8),
        hour: 17,
        minute: 0,
        utc_offset_minutes: -360,
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        student_info: "Physics undergraduate".to_string(),
        provider: ProviderKind::Gemini,
        attachment_path: Some(PathBuf::from("resume.pdf")),
        schedule: fixed_schedule(),
    }
}

#[tokio::test]
async fn test_failed_record_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let records: Vec<_> = (1..=6)
        .map(|i| {
            CandidateRecord::new(format!("Dr. {i}"), format!("prof{i}@example.edu"))
                .with_field("Department", "Physics")
        })
        .collect();
    let path = write_records(&dir, &records);

    let store = Arc::new(JsonRecordStore::new(&path));
    let scheduler = Arc::new(DryRunScheduler::new());
    let parts = PipelineParts {
        store: store.clone(),
        queries: Arc::new(TemplateQueryGenerator::new(vec![
            "{name} {Department} publications".to_string(),
        ])),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(SelectiveComposer {
            reject: vec!["Dr. 3".to_string()],
        }),
        scheduler: scheduler.clone(),
    };

    let report = OutreachPipeline::new(parts, settings()).run().await.unwrap();

    assert_eq!(report.processed, vec!["Dr. 1", "Dr. 2", "Dr. 4", "Dr. 5", "Dr. 6"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].identifier, "Dr. 3");
    assert_eq!(report.failed[0].stage, PipelineStage::Compose);
    assert!(!report.is_clean());

    let stored = store.load_all().await.unwrap();
    let sent: Vec<_> = stored.iter().filter(|r| r.sent).map(|r| r.identifier.as_str()).collect();
    assert_eq!(sent, vec!["Dr. 1", "Dr. 2", "Dr. 4", "Dr. 5", "Dr. 6"]);
    assert_eq!(
        stored[0].email_to_send.as_deref(),
        Some("Subject: Inquiry for Dr. 1\n\nPhysics undergraduate | Dr. 1 Physics publications")
    );
    assert!(stored[2].email_to_send.is_none());

    let pending = store.load_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].identifier, "Dr. 3");

    let scheduled = scheduler.scheduled().await;
    let times: Vec<String> = scheduled.iter().map(|(_, at)| at.to_rfc3339()).collect();
    assert_eq!(
        times,
        vec![
            "2024-01-08T23:00:00+00:00",
            "2024-01-08T23:00:00+00:00",
            "2024-01-08T23:00:00+00:00",
            "2024-01-08T23:00:00+00:00",
            "2024-01-08T23:01:00+00:00",
        ]
    );
    assert!(
        scheduled
            .iter()
            .all(|(email, _)| email.attachment_path == Some(PathBuf::from("resume.pdf")))
    );
}

#[tokio::test]
async fn test_already_sent_records_are_skipped() {
    let dir = TempDir::new().unwrap();
    let mut done = CandidateRecord::new("Dr. Done", "done@example.edu");
    done.sent = true;
    let path = write_records(&dir, &[done, CandidateRecord::new("Dr. New", "new@example.edu")]);

    let scheduler = Arc::new(DryRunScheduler::new());
    let parts = PipelineParts {
        store: Arc::new(JsonRecordStore::new(&path)),
        queries: Arc::new(TemplateQueryGenerator::new(vec![])),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(SelectiveComposer { reject: vec![] }),
        scheduler: scheduler.clone(),
    };

    let report = OutreachPipeline::new(parts, settings()).run().await.unwrap();

    assert_eq!(report.processed, vec!["Dr. New"]);
    assert!(report.is_clean());
    assert_eq!(scheduler.scheduled().await.len(), 1);
}

#[tokio::test]
async fn test_missing_record_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let parts = PipelineParts {
        store: Arc::new(JsonRecordStore::new(dir.path().join("absent.json"))),
        queries: Arc::new(TemplateQueryGenerator::new(vec![])),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(SelectiveComposer { reject: vec![] }),
        scheduler: Arc::new(DryRunScheduler::new()),
    };

    let result = OutreachPipeline::new(parts, settings()).run().await;
    assert!(matches!(result, Err(OutreachError::Store(_))));
}

#[tokio::test]
async fn test_unknown_query_placeholder_fails_record() {
    let dir = TempDir::new().unwrap();
    let path = write_records(&dir, &[CandidateRecord::new("Dr. Ada", "ada@example.edu")]);

    let parts = PipelineParts {
        store: Arc::new(JsonRecordStore::new(&path)),
        queries: Arc::new(TemplateQueryGenerator::new(vec!["{university}".to_string()])),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(SelectiveComposer { reject: vec![] }),
        scheduler: Arc::new(DryRunScheduler::new()),
    };

    let report = OutreachPipeline::new(parts, settings()).run().await.unwrap();

    assert!(report.processed.is_empty());
    assert_eq!(report.failed[0].stage, PipelineStage::Queries);
}

#[tokio::test]
async fn test_evaluated_composer_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = write_records(
        &dir,
        &[CandidateRecord::new("Dr. Ada", "ada@example.edu").with_field("Lab", "Optics")],
    );

    let generator = Arc::new(ScriptedGenerator {
        prompts: Mutex::new(Vec::new()),
    });
    let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig {
        max_requests: 10,
        window: Duration::from_secs(60),
    }));
    let dispatcher =
        Arc::new(GenerationDispatcher::new(limiter.clone()).with_provider(generator.clone()));
    let evaluator = Arc::new(BestOfNEvaluator::new(dispatcher, EvaluationConfig::default()));

    let templates = ComposerTemplates {
        body_prompt: "Email {name} of the {Lab} lab for {student_info}".to_string(),
        ..ComposerTemplates::default()
    };
    let store = Arc::new(JsonRecordStore::new(&path));
    let parts = PipelineParts {
        store: store.clone(),
        queries: Arc::new(TemplateQueryGenerator::new(vec!["{name}".to_string()])),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(EvaluatedEmailComposer::new(evaluator, templates)),
        scheduler: Arc::new(DryRunScheduler::new()),
    };

    let report = OutreachPipeline::new(parts, settings()).run().await.unwrap();
    assert!(report.is_clean());

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 5);
    assert!(
        prompts[..3]
            .iter()
            .all(|p| p == "Email Dr. Ada of the Optics lab for Physics undergraduate")
    );
    assert_eq!(limiter.recorded(), 5);

    let stored = store.load_all().await.unwrap();
    assert_eq!(
        stored[0].email_to_send.as_deref(),
        Some("Subject: Research assistant inquiry\n\nDear Dr. Ada, draft 2")
    );
}
