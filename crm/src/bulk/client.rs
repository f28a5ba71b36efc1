use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiPaths;
use crate::bail;
use crate::bulk::job::{
    BatchStatus, BulkJob, Closed, Created, JOB_CONTENT_TYPE, JobOperation, Submitted,
};
use crate::bulk::poll::{PollMode, PollOutcome, PollPolicy};
use crate::bulk::result::BatchResult;
use crate::error::{CrmResult, ErrorKind};
use crate::transport::{AuthScheme, Request, Transport};
use crate::types::RecordId;

#[derive(Debug, Deserialize)]
struct JobInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchInfo {
    id: String,
    state: String,
    #[serde(default)]
    state_message: Option<String>,
}

/// Drives bulk jobs through their lifecycle.
///
/// A job is created, receives exactly one batch, is closed, polled until its batch reaches a
/// terminal status and finally has its result fetched. Every step is a method taking the job
/// handle of the previous step.
#[derive(Debug, Clone)]
pub struct BulkClient<T> {
    transport: T,
    paths: ApiPaths,
    policy: PollPolicy,
    cancellation: CancellationToken,
}

impl<T> BulkClient<T>
where
    T: Transport + Sync,
{
    pub fn new(transport: T, paths: ApiPaths) -> Self {
        Self {
            transport,
            paths,
            policy: PollPolicy::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Aborts blocking polls once `cancellation` is cancelled.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Creates a job applying `operation` to records of type `object`.
    pub async fn create_job(
        &self,
        operation: JobOperation,
        object: &str,
    ) -> CrmResult<BulkJob<Created>> {
        let body = json!({
            "operation": operation,
            "object": object,
            "contentType": JOB_CONTENT_TYPE,
        });

        let info: JobInfo = self
            .transport
            .request(Request::post_json(self.paths.jobs(), body).with_auth(AuthScheme::Session))
            .await?
            .reject_failure("Bulk job creation was rejected")?
            .json()?;

        info!(job_id = %info.id, %operation, object, "created bulk job");

        Ok(BulkJob::created(info.id, operation, object.to_owned()))
    }

    /// Submits `records` as the only batch of `job`.
    pub async fn submit_batch(
        &self,
        job: BulkJob<Created>,
        records: Vec<Value>,
    ) -> CrmResult<BulkJob<Submitted>> {
        let count = records.len();
        let info: BatchInfo = self
            .transport
            .request(
                Request::post_json(self.paths.batches(job.id()), Value::Array(records))
                    .with_auth(AuthScheme::Session),
            )
            .await?
            .reject_failure("Bulk batch submission was rejected")?
            .json()?;

        info!(job_id = %job.id(), batch_id = %info.id, records = count, "submitted bulk batch");

        Ok(job.into_submitted(info.id))
    }

    /// Marks `job` as closed so the platform processes it.
    ///
    /// The outcome of the close call is logged but not verified: polling the batch is what
    /// determines whether the job went through.
    pub async fn close(&self, job: BulkJob<Submitted>) -> CrmResult<BulkJob<Closed>> {
        let response = self
            .transport
            .request(
                Request::post_json(self.paths.job(job.id()), json!({ "state": "Closed" }))
                    .with_auth(AuthScheme::Session),
            )
            .await?;

        if response.status.is_success() {
            debug!(job_id = %job.id(), status = %response.status, "closed bulk job");
        } else {
            warn!(
                job_id = %job.id(),
                status = %response.status,
                body = %response.body,
                "closing bulk job was not confirmed, continuing with polling"
            );
        }

        Ok(job.into_closed())
    }

    /// Fetches the current batch status, failing if it is neither running nor completed.
    async fn check(&self, job: &BulkJob<Closed>) -> CrmResult<BatchStatus> {
        let info: BatchInfo = self
            .transport
            .request(
                Request::get(self.paths.batch(job.id(), job.batch_id()))
                    .with_auth(AuthScheme::Session),
            )
            .await?
            .reject_failure("Bulk batch status request was rejected")?
            .json()?;

        let status = BatchStatus::parse(&info.state);
        if status != BatchStatus::Completed && !status.is_in_progress() {
            let message = info.state_message.unwrap_or_default();
            bail!(
                ErrorKind::BulkBatchFailed,
                "Bulk batch ended in an unexpected state",
                format!("batch '{}': {status} {message}", job.batch_id())
                    .trim_end()
                    .to_owned()
            );
        }

        Ok(status)
    }

    /// Checks the batch of `job` once or until it reaches a terminal status.
    ///
    /// A batch in any status other than queued, in progress or completed fails the poll. In
    /// blocking mode checks are separated by the policy interval; the poll gives up when the
    /// policy deadline passes or the cancellation token fires.
    pub async fn poll(&self, job: &BulkJob<Closed>, mode: PollMode) -> CrmResult<PollOutcome> {
        let started = Instant::now();
        let mut checks = 0u32;

        loop {
            checks += 1;
            let status = self.check(job).await?;

            if status == BatchStatus::Completed {
                info!(job_id = %job.id(), batch_id = %job.batch_id(), checks, "bulk batch completed");
                return Ok(PollOutcome::Completed);
            }

            debug!(job_id = %job.id(), batch_id = %job.batch_id(), %status, checks, "bulk batch not completed yet");

            if mode == PollMode::Once {
                return Ok(PollOutcome::Pending(status));
            }

            let expired = self
                .policy
                .deadline
                .is_some_and(|deadline| started.elapsed() >= deadline);
            if expired {
                bail!(
                    ErrorKind::BulkPollTimedOut,
                    "Bulk batch did not complete before the poll deadline",
                    format!(
                        "batch '{}' still {status} after {checks} checks",
                        job.batch_id()
                    )
                );
            }

            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    bail!(
                        ErrorKind::OperationCanceled,
                        "Polling the bulk batch was canceled",
                        format!("batch '{}'", job.batch_id())
                    );
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }

    /// Waits for the batch of `job` to complete and returns its raw result.
    pub async fn fetch_result(&self, job: BulkJob<Closed>) -> CrmResult<BatchResult> {
        if let PollOutcome::Pending(status) = self.poll(&job, PollMode::Blocking).await? {
            bail!(
                ErrorKind::Unknown,
                "Blocking poll returned before the batch completed",
                status
            );
        }

        let response = self
            .transport
            .request(
                Request::get(self.paths.batch_result(job.id(), job.batch_id()))
                    .with_auth(AuthScheme::Session),
            )
            .await?
            .reject_failure("Bulk batch result request was rejected")?;

        Ok(BatchResult {
            job_id: job.id().to_owned(),
            batch_id: job.batch_id().to_owned(),
            status: response.status,
            body: response.body,
        })
    }

    /// Runs a complete job lifecycle for one batch and returns its result.
    pub async fn run_job(
        &self,
        operation: JobOperation,
        object: &str,
        records: Vec<Value>,
    ) -> CrmResult<BatchResult> {
        let job = self.create_job(operation, object).await?;
        let job = self.submit_batch(job, records).await?;
        let job = self.close(job).await?;

        self.fetch_result(job).await
    }

    /// Inserts `records` of type `object` through one job.
    pub async fn insert_records(&self, object: &str, records: Vec<Value>) -> CrmResult<BatchResult> {
        self.run_job(JobOperation::Insert, object, records).await
    }

    /// Deletes the records `ids` of type `object` through one job.
    ///
    /// The result lists one outcome per id, in the order of `ids`.
    pub async fn delete_records(&self, object: &str, ids: &[RecordId]) -> CrmResult<BatchResult> {
        let records = ids.iter().map(|id| json!({ "Id": id })).collect();
        self.run_job(JobOperation::Delete, object, records).await
    }
}
