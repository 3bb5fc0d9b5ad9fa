use crate::outreach::collaborators::RecordStore;
use crate::outreach::types::{CandidateRecord, OutreachError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

type RawRecord = Map<String, Value>;

/// Accepted spellings of the written-back columns, preferred spelling first.
const SENT_KEYS: [&str; 2] = ["sent", "Sent"];
const EMAIL_KEYS: [&str; 2] = ["email_to_send", "Email_To_Send"];

/// Records kept as a JSON array in a single file.
///
/// Updates patch the stored object in place: columns keep the spelling they
/// were read with (`Sent`/`Email_To_Send` stay legacy) and untouched records
/// are written back as they were. The whole file is rewritten through a
/// temporary sibling and a rename, serialized by an internal lock.
pub struct JsonRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record, each tagged with its position in the file.
    pub async fn load_all(&self) -> Result<Vec<CandidateRecord>, OutreachError> {
        let raw = self.load_raw().await?;
        parse_records(&raw)
    }

    async fn load_raw(&self) -> Result<Vec<RawRecord>, OutreachError> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            OutreachError::Store(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_raw(&self, records: &[RawRecord]) -> Result<(), OutreachError> {
        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn parse_records(raw: &[RawRecord]) -> Result<Vec<CandidateRecord>, OutreachError> {
    let mut records = Vec::with_capacity(raw.len());
    for (index, object) in raw.iter().enumerate() {
        let mut record: CandidateRecord = serde_json::from_value(Value::Object(object.clone()))?;
        record.position = Some(index);
        records.push(record);
    }
    Ok(records)
}

/// Finds the stored slot for `record`: its recorded position when that slot
/// still holds the same identifier and contact, otherwise the single record
/// with that identifier and contact.
fn locate(stored: &[CandidateRecord], record: &CandidateRecord) -> Result<usize, OutreachError> {
    let same = |r: &CandidateRecord| r.identifier == record.identifier && r.contact == record.contact;

    if let Some(index) = record
        .position
        .filter(|&i| stored.get(i).is_some_and(|r| same(r)))
    {
        return Ok(index);
    }

    let matches: Vec<usize> = stored
        .iter()
        .enumerate()
        .filter(|(_, r)| same(*r))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(OutreachError::Store(format!(
            "no record for '{}' <{}>",
            record.identifier, record.contact
        ))),
        _ => Err(OutreachError::Store(format!(
            "{} records match '{}' <{}>; cannot tell which to update",
            matches.len(),
            record.identifier,
            record.contact
        ))),
    }
}

fn existing_key(object: &RawRecord, spellings: &[&'static str]) -> &'static str {
    spellings
        .iter()
        .copied()
        .find(|key| object.contains_key(*key))
        .unwrap_or(spellings[0])
}

/// Writes the mutable parts of `record` into its stored object.
fn patch(object: &mut RawRecord, record: &CandidateRecord) {
    let sent_key = existing_key(object, &SENT_KEYS);
    // Integer flags stay integers.
    let sent = match object.get(sent_key) {
        Some(Value::Number(_)) => Value::from(u8::from(record.sent)),
        _ => Value::Bool(record.sent),
    };
    object.insert(sent_key.to_string(), sent);

    if let Some(email) = &record.email_to_send {
        let key = existing_key(object, &EMAIL_KEYS);
        object.insert(key.to_string(), Value::String(email.clone()));
    }
    if !record.queries.is_empty() {
        object.insert("queries".to_string(), Value::from(record.queries.clone()));
    }
    if !record.search_results.is_empty() {
        object.insert(
            "search_results".to_string(),
            Value::from(record.search_results.clone()),
        );
    }
    for (key, value) in &record.fields {
        object.insert(key.clone(), value.clone());
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn load_pending(&self) -> Result<Vec<CandidateRecord>, OutreachError> {
        let records = self.load_all().await?;
        let total = records.len();
        let pending: Vec<_> = records.into_iter().filter(|r| !r.sent).collect();
        info!(
            total,
            pending = pending.len(),
            "Loaded candidate records from {:?}",
            self.path
        );
        Ok(pending)
    }

    async fn update(&self, record: &CandidateRecord) -> Result<(), OutreachError> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.load_raw().await?;
        let stored = parse_records(&raw)?;

        let index = locate(&stored, record)?;
        patch(&mut raw[index], record);

        self.write_raw(&raw).await?;
        debug!(identifier = %record.identifier, index, "Record updated");
        Ok(())
    }
}
