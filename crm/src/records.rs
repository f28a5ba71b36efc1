//! Per-record operations through the REST API.

use futures::TryStreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::ApiPaths;
use crate::error::CrmResult;
use crate::query::{Field, QueryReader, RecordQuery};
use crate::transport::{Request, Transport};
use crate::types::RecordId;

/// A record the platform refused to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub id: RecordId,
    pub status: StatusCode,
    pub message: String,
}

/// Outcome of deleting records one by one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Number of records whose deletion was confirmed.
    pub deleted: usize,
    pub failures: Vec<DeleteFailure>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: RecordId,
}

/// Reads, creates and deletes individual records.
#[derive(Debug, Clone)]
pub struct RecordClient<T> {
    transport: T,
    paths: ApiPaths,
    reader: QueryReader<T>,
}

impl<T> RecordClient<T>
where
    T: Transport + Clone + Sync,
{
    pub fn new(transport: T, paths: ApiPaths) -> Self {
        let reader = QueryReader::new(transport.clone(), paths.clone());
        Self {
            transport,
            paths,
            reader,
        }
    }

    /// Returns `true` if every record in `ids` can be read.
    ///
    /// Every id is checked, so each missing record is logged.
    pub async fn exists(&self, object: &str, ids: &[RecordId]) -> CrmResult<bool> {
        let mut all_exist = true;
        for id in ids {
            let response = self
                .transport
                .request(Request::get(self.paths.sobject_record(object, id)))
                .await?;

            if response.status == StatusCode::OK {
                info!(object, id = %id, "record exists");
            } else {
                warn!(object, id = %id, status = %response.status, error = %response.error_message(), "record cannot be read");
                all_exist = false;
            }
        }

        Ok(all_exist)
    }

    /// Creates one record and returns its identifier.
    pub async fn create(&self, object: &str, fields: Value) -> CrmResult<RecordId> {
        let created: CreatedRecord = self
            .transport
            .request(Request::post_json(self.paths.sobject(object), fields))
            .await?
            .reject_failure("Record creation was rejected")?
            .json()?;

        info!(object, id = %created.id, "created record");

        Ok(created.id)
    }

    /// Deletes the records `ids` one by one.
    ///
    /// A record the platform refuses to delete is reported and does not stop the remaining
    /// deletions. Failing to reach the platform does.
    pub async fn delete(&self, object: &str, ids: &[RecordId]) -> CrmResult<DeleteReport> {
        let mut report = DeleteReport::default();
        for id in ids {
            let response = self
                .transport
                .request(Request::delete(self.paths.sobject_record(object, id)))
                .await?;

            if response.status == StatusCode::NO_CONTENT {
                info!(object, id = %id, "deleted record");
                report.deleted += 1;
            } else {
                let message = response.error_message();
                warn!(object, id = %id, status = %response.status, error = %message, "failed to delete record");
                report.failures.push(DeleteFailure {
                    id: id.clone(),
                    status: response.status,
                    message,
                });
            }
        }

        Ok(report)
    }

    /// Lists the identifiers of records of type `object`, optionally filtered by `condition`.
    pub async fn ids(&self, object: &str, condition: Option<String>) -> CrmResult<Vec<RecordId>> {
        let mut query = RecordQuery::new(object, vec![Field::Named("Id".to_owned())])?;
        if let Some(condition) = condition {
            query = query.with_condition(condition);
        }

        self.reader
            .list(&query)
            .map_ok(|row| row.get("Id").unwrap_or_default().to_owned())
            .try_collect()
            .await
    }

    /// Deletes every record of type `object`.
    pub async fn delete_all(&self, object: &str) -> CrmResult<DeleteReport> {
        let ids = self.ids(object, None).await?;
        info!(object, records = ids.len(), "deleting every record");

        self.delete(object, &ids).await
    }
}
