use serde::Serialize;
use std::fmt;

use crate::types::{BatchId, JobId};

/// Operation applied to every record of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOperation {
    Insert,
    Delete,
}

impl JobOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOperation::Insert => "insert",
            JobOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for JobOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of every job. Batches, statuses and results are then exchanged as JSON.
pub(crate) const JOB_CONTENT_TYPE: &str = "JSON";

/// Lifecycle state of a bulk job as seen by the client.
///
/// Jobs move strictly forward: `Created → Submitted → Closed → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Submitted,
    Closed,
    Completed,
    Failed,
}

/// Status of a batch as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    NotProcessed,
    Other(String),
}

impl BatchStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "Queued" => BatchStatus::Queued,
            "InProgress" => BatchStatus::InProgress,
            "Completed" => BatchStatus::Completed,
            "Failed" => BatchStatus::Failed,
            "Not Processed" | "NotProcessed" => BatchStatus::NotProcessed,
            other => BatchStatus::Other(other.to_owned()),
        }
    }

    /// Returns `true` for the two statuses which are still expected to change.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BatchStatus::Queued | BatchStatus::InProgress)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Queued => "Queued",
            BatchStatus::InProgress => "InProgress",
            BatchStatus::Completed => "Completed",
            BatchStatus::Failed => "Failed",
            BatchStatus::NotProcessed => "Not Processed",
            BatchStatus::Other(status) => status,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for the stage a [`BulkJob`] handle is in.
pub trait JobStage {
    const STATE: JobState;
}

/// The job exists on the platform and accepts its batch.
#[derive(Debug)]
pub struct Created;

/// The batch was accepted; the job still has to be closed.
#[derive(Debug)]
pub struct Submitted {
    batch_id: BatchId,
}

/// The job was closed and its batch can be polled.
#[derive(Debug)]
pub struct Closed {
    batch_id: BatchId,
}

impl JobStage for Created {
    const STATE: JobState = JobState::Created;
}

impl JobStage for Submitted {
    const STATE: JobState = JobState::Submitted;
}

impl JobStage for Closed {
    const STATE: JobState = JobState::Closed;
}

/// Handle to one bulk job, owned by whoever drives its lifecycle.
///
/// Transitions consume the handle and return one for the next stage, so a batch cannot be
/// submitted twice and results cannot be fetched from a job that was never closed. Handles are
/// deliberately not [`Clone`].
#[derive(Debug)]
pub struct BulkJob<S> {
    id: JobId,
    operation: JobOperation,
    object: String,
    stage: S,
}

impl BulkJob<Created> {
    pub(crate) fn created(id: JobId, operation: JobOperation, object: String) -> Self {
        Self {
            id,
            operation,
            object,
            stage: Created,
        }
    }

    pub(crate) fn into_submitted(self, batch_id: BatchId) -> BulkJob<Submitted> {
        self.advance(Submitted { batch_id })
    }
}

impl BulkJob<Submitted> {
    pub fn batch_id(&self) -> &str {
        &self.stage.batch_id
    }

    pub(crate) fn into_closed(self) -> BulkJob<Closed> {
        let batch_id = self.stage.batch_id.clone();
        self.advance(Closed { batch_id })
    }
}

impl BulkJob<Closed> {
    pub fn batch_id(&self) -> &str {
        &self.stage.batch_id
    }
}

impl<S: JobStage> BulkJob<S> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> JobOperation {
        self.operation
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn state(&self) -> JobState {
        S::STATE
    }

    fn advance<N>(self, stage: N) -> BulkJob<N> {
        BulkJob {
            id: self.id,
            operation: self.operation,
            object: self.object,
            stage,
        }
    }
}
