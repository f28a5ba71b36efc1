//! Endpoint paths of the REST and bulk APIs.
//!
//! Paths are relative to the instance URL. The REST API lives under
//! `/services/data/v{version}` and the bulk API under `/services/async/{version}`.

use url::form_urlencoded;

/// Default version used for both APIs.
pub const DEFAULT_API_VERSION: &str = "42.0";

/// Versioned endpoint builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    rest_version: String,
    bulk_version: String,
}

impl ApiPaths {
    pub fn new(rest_version: impl Into<String>, bulk_version: impl Into<String>) -> Self {
        Self {
            rest_version: rest_version.into(),
            bulk_version: bulk_version.into(),
        }
    }

    /// Query endpoint carrying the url-encoded SOQL statement.
    pub fn query(&self, soql: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(soql.as_bytes()).collect();
        format!("/services/data/v{}/query?q={encoded}", self.rest_version)
    }

    /// Collection endpoint of an object type, used to create records.
    pub fn sobject(&self, object: &str) -> String {
        format!("/services/data/v{}/sobjects/{object}/", self.rest_version)
    }

    /// Endpoint of one record, used to read or delete it.
    pub fn sobject_record(&self, object: &str, id: &str) -> String {
        format!("/services/data/v{}/sobjects/{object}/{id}", self.rest_version)
    }

    pub fn jobs(&self) -> String {
        format!("/services/async/{}/job", self.bulk_version)
    }

    pub fn job(&self, job_id: &str) -> String {
        format!("/services/async/{}/job/{job_id}", self.bulk_version)
    }

    pub fn batches(&self, job_id: &str) -> String {
        format!("{}/batch", self.job(job_id))
    }

    pub fn batch(&self, job_id: &str, batch_id: &str) -> String {
        format!("{}/batch/{batch_id}", self.job(job_id))
    }

    pub fn batch_result(&self, job_id: &str, batch_id: &str) -> String {
        format!("{}/result", self.batch(job_id, batch_id))
    }
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION, DEFAULT_API_VERSION)
    }
}

/// Quotes a value as a SOQL string literal, escaping backslashes and single quotes.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');

    quoted
}
