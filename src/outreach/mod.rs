//! Batch outreach around the generation core.
//!
//! Each pending record goes through query generation, search, email
//! composition and scheduling; the record is then marked as sent.

pub mod collaborators;
pub mod composer;
pub mod pipeline;
pub mod schedule;
pub mod store;
pub mod template;
pub mod types;

pub use collaborators::{
    DryRunScheduler, EmailComposer, EmailScheduler, NoopSearchExecutor, QueryGenerator,
    RecordStore, SearchExecutor, TemplateQueryGenerator,
};
pub use composer::{ComposerTemplates, EvaluatedEmailComposer};
pub use pipeline::{OutreachPipeline, PipelineParts, PipelineSettings};
pub use schedule::{SendSchedule, stagger_minutes};
pub use store::JsonRecordStore;
pub use types::*;
