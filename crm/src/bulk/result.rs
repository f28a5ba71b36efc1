use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CrmResult;
use crate::types::{BatchId, JobId, RecordId};

/// Raw result payload of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub job_id: JobId,
    pub batch_id: BatchId,
    pub status: StatusCode,
    pub body: String,
}

/// Outcome of one submitted record, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResultRecord {
    /// Identifier of the affected record. Missing when the record failed.
    pub id: Option<RecordId>,
    pub success: bool,
    pub created: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawResultRecord {
    id: Option<String>,
    success: bool,
    #[serde(default)]
    created: bool,
    #[serde(default)]
    errors: Vec<Value>,
}

impl BatchResult {
    /// Parses the per-record outcomes, keeping the order in which records were submitted.
    pub fn records(&self) -> CrmResult<Vec<BatchResultRecord>> {
        let records: Vec<RawResultRecord> = serde_json::from_str(&self.body)?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Returns the failed records with their position in the submitted batch.
    pub fn failures(&self) -> CrmResult<Vec<(usize, BatchResultRecord)>> {
        Ok(self
            .records()?
            .into_iter()
            .enumerate()
            .filter(|(_, record)| !record.success)
            .collect())
    }
}

impl From<RawResultRecord> for BatchResultRecord {
    fn from(record: RawResultRecord) -> Self {
        let errors = record
            .errors
            .into_iter()
            .map(|error| match error.get("message").and_then(Value::as_str) {
                Some(message) => message.to_owned(),
                None => error.to_string(),
            })
            .collect();

        Self {
            id: record.id.filter(|id| !id.is_empty()),
            success: record.success,
            created: record.created,
            errors,
        }
    }
}
