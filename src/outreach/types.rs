use crate::llm::LLMError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// One outreach target as stored by the record source.
///
/// Only `identifier`, `contact`, `sent` and `email_to_send` are interpreted;
/// every other column is carried through `fields` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(alias = "Employee")]
    pub identifier: String,
    #[serde(alias = "Contact")]
    pub contact: String,
    #[serde(default, alias = "Sent", deserialize_with = "deserialize_flag")]
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_results: Vec<String>,
    #[serde(default, alias = "Email_To_Send", skip_serializing_if = "Option::is_none")]
    pub email_to_send: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Index of the record in its store, when the store tracks one.
    #[serde(skip)]
    pub position: Option<usize>,
}

impl CandidateRecord {
    pub fn new(identifier: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            contact: contact.into(),
            sent: false,
            queries: Vec::new(),
            search_results: Vec::new(),
            email_to_send: None,
            fields: BTreeMap::new(),
            position: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Placeholder values for prompt and query templates.
    pub fn template_values(&self) -> HashMap<String, String> {
        let mut values: HashMap<String, String> = self
            .fields
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect();

        values.insert("identifier".to_string(), self.identifier.clone());
        values.insert("name".to_string(), self.identifier.clone());
        values.insert("contact".to_string(), self.contact.clone());
        values.insert("queries".to_string(), self.queries.join("\n"));
        values.insert("search_results".to_string(), self.search_results.join("\n\n"));
        values
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` integers older stores use.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

/// Output of an email composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedEmail {
    pub subject: String,
    pub body: String,
}

impl ComposedEmail {
    /// Full text stored back on the record once scheduled.
    pub fn full_content(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}

/// One message handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub contact: String,
    pub email_body: String,
    pub subject: String,
    pub attachment_path: Option<PathBuf>,
    pub sent: bool,
}

/// Pipeline step a record failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Queries,
    Search,
    Compose,
    Schedule,
    Store,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Queries => "query generation",
            PipelineStage::Search => "search",
            PipelineStage::Compose => "email composition",
            PipelineStage::Schedule => "scheduling",
            PipelineStage::Store => "record update",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub identifier: String,
    pub stage: PipelineStage,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub failed: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    #[error(transparent)]
    Generation(#[from] LLMError),
    #[error("Record store error: {0}")]
    Store(String),
    #[error("Search error: {0}")]
    Search(String),
    #[error("Scheduling error: {0}")]
    Schedule(String),
    #[error("Template error: {0}")]
    Template(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
