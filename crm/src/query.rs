//! Paginated record listings.
//!
//! [`QueryReader`] issues a query once and then follows the continuation cursor returned with
//! every page until the platform stops returning one. Rows are produced lazily in page order.

use futures::{Stream, TryStreamExt, future, stream};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ApiPaths;
use crate::crm_error;
use crate::error::{CrmResult, ErrorKind};
use crate::transport::{Request, Transport};

/// Field name marking a blank column in a field list.
pub const BLANK_FIELD: &str = "-";

/// One record as returned by the query endpoint.
pub type Record = serde_json::Map<String, Value>;

/// A requested column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A field queried from the platform. Dotted names walk into related records.
    Named(String),
    /// A placeholder column which is always empty and never queried.
    Blank,
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Named(name) => name,
            Field::Blank => BLANK_FIELD,
        }
    }
}

/// Describes a listing: an object type, the requested columns and an optional filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    object: String,
    fields: Vec<Field>,
    condition: Option<String>,
}

impl RecordQuery {
    /// Creates a query, failing if no column would be queried from the platform.
    pub fn new(object: impl Into<String>, fields: Vec<Field>) -> CrmResult<Self> {
        let object = object.into();
        if object.trim().is_empty() {
            crate::bail!(ErrorKind::InvalidQuery, "Query object type is empty");
        }

        if !fields.iter().any(|field| matches!(field, Field::Named(_))) {
            crate::bail!(
                ErrorKind::InvalidQuery,
                "Query requests no platform field",
                object
            );
        }

        Ok(Self {
            object,
            fields,
            condition: None,
        })
    }

    /// Parses a comma separated field list where `-` marks a blank column.
    pub fn parse(object: impl Into<String>, field_list: &str) -> CrmResult<Self> {
        let mut fields = Vec::new();
        for name in field_list.split(',').map(str::trim) {
            match name {
                "" => crate::bail!(
                    ErrorKind::InvalidQuery,
                    "Field list contains an empty field name",
                    field_list
                ),
                BLANK_FIELD => fields.push(Field::Blank),
                name => fields.push(Field::Named(name.to_owned())),
            }
        }

        Self::new(object, fields)
    }

    /// Restricts the listing with a SOQL condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column names in request order, blanks included.
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name().to_owned()).collect()
    }

    /// Builds the SOQL statement, leaving blank columns out.
    pub fn soql(&self) -> String {
        let fields = self
            .fields
            .iter()
            .filter_map(|field| match field {
                Field::Named(name) => Some(name.as_str()),
                Field::Blank => None,
            })
            .collect::<Vec<_>>()
            .join(",");

        match &self.condition {
            Some(condition) => format!("SELECT {fields} FROM {} WHERE {condition}", self.object),
            None => format!("SELECT {fields} FROM {}", self.object),
        }
    }

    /// Projects a raw record onto the requested columns, sanitizing every value.
    pub fn project(&self, record: &Record) -> CrmResult<Row> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match field {
                Field::Blank => values.push((BLANK_FIELD.to_owned(), String::new())),
                Field::Named(name) => {
                    let value = lookup(record, name).ok_or_else(|| {
                        crm_error!(
                            ErrorKind::InvalidData,
                            "Queried field is missing from the returned record",
                            name
                        )
                    })?;
                    values.push((name.clone(), sanitize(&render(value))));
                }
            }
        }

        Ok(Row { values })
    }
}

/// One listed record: column names paired with sanitized values, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<(String, String)>,
}

impl Row {
    /// Returns the value of the first column named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.as_str())
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Replaces every character outside `[a-zA-Z0-9@ßäüö]` with a single space.
///
/// The output only contains allowed characters and spaces, so applying it twice gives the
/// same result as applying it once.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | 'ß' | 'ä' | 'ü' | 'ö') {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = get_field(record, segments.next()?)?;

    for segment in segments {
        current = match current {
            // A missing related record ends the path.
            Value::Null => return Some(current),
            Value::Object(related) => get_field(related, segment)?,
            _ => return None,
        };
    }

    Some(current)
}

fn get_field<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    record.get(name).or_else(|| {
        record
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    total_size: u64,
    records: Vec<Record>,
    next_records_url: Option<String>,
}

#[derive(Debug)]
struct Cursor {
    target: String,
    streamed: u64,
}

/// Reads listings page by page through a [`Transport`].
#[derive(Debug, Clone)]
pub struct QueryReader<T> {
    transport: T,
    paths: ApiPaths,
}

impl<T> QueryReader<T>
where
    T: Transport + Sync,
{
    pub fn new(transport: T, paths: ApiPaths) -> Self {
        Self { transport, paths }
    }

    /// Streams the raw records matching `soql`.
    ///
    /// The stream is single pass. Calling this again re-issues the query from the start.
    pub fn records(&self, soql: String) -> impl Stream<Item = CrmResult<Record>> + '_ {
        let initial = Cursor {
            target: self.paths.query(&soql),
            streamed: 0,
        };

        stream::try_unfold(Some(initial), move |cursor| self.read_page(cursor))
            .map_ok(|records| stream::iter(records.into_iter().map(Ok)))
            .try_flatten()
    }

    async fn read_page(
        &self,
        cursor: Option<Cursor>,
    ) -> CrmResult<Option<(Vec<Record>, Option<Cursor>)>> {
        let Some(cursor) = cursor else {
            return Ok(None);
        };

        let page: QueryPage = self
            .transport
            .request(Request::get(&cursor.target))
            .await?
            .reject_failure("Query request was rejected")?
            .json()?;

        let streamed = cursor.streamed + page.records.len() as u64;
        debug!(
            cursor = %cursor.target,
            page_records = page.records.len(),
            streamed,
            total_size = page.total_size,
            "read query page"
        );

        let next = match page.next_records_url {
            Some(target) => Some(Cursor { target, streamed }),
            None => {
                if streamed != page.total_size {
                    warn!(
                        streamed,
                        total_size = page.total_size,
                        "query stream ended with a record count different from the reported total"
                    );
                }
                None
            }
        };

        Ok(Some((page.records, next)))
    }

    /// Streams the sanitized rows of `query`.
    pub fn list<'a>(&'a self, query: &'a RecordQuery) -> impl Stream<Item = CrmResult<Row>> + 'a {
        self.records(query.soql())
            .and_then(move |record| future::ready(query.project(&record)))
    }

    /// Collects every row of `query`.
    pub async fn collect_rows(&self, query: &RecordQuery) -> CrmResult<Vec<Row>> {
        self.list(query).try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transport::ScriptedTransport;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize("Müller & Söhne GmbH"), "Müller   Söhne GmbH");
        assert_eq!(sanitize("info@acme.de"), "info@acme de");
        assert_eq!(sanitize("Straße 5-7, 1. OG"), "Straße 5 7  1  OG");
        assert_eq!(sanitize("Ärger"), " rger");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "plain",
            "Müller & Söhne GmbH",
            "tab\there\nnewline",
            "ÄÖÜ äöü ß €",
            "0011r00001mj00xAAA",
            "\"quoted\";semi;colon",
        ];

        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "sample: {sample:?}");
            assert_eq!(once.chars().count(), sample.chars().count());
        }
    }

    #[test]
    fn test_parse_field_list_with_blanks() {
        let query = RecordQuery::parse("Account", "Id,BillingCountry,-,Name,-").unwrap();

        assert_eq!(
            query.header(),
            vec!["Id", "BillingCountry", "-", "Name", "-"]
        );
        assert_eq!(query.soql(), "SELECT Id,BillingCountry,Name FROM Account");
    }

    #[test]
    fn test_parse_rejects_only_blank_or_empty_fields() {
        let err = RecordQuery::parse("Account", "-,-").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);

        let err = RecordQuery::parse("Account", "Id,,Name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
    }

    #[test]
    fn test_soql_with_condition() {
        let query = RecordQuery::parse("DuplicateRecordSet", "Id")
            .unwrap()
            .with_condition("DuplicateRuleId = '0Bm1'");

        assert_eq!(
            query.soql(),
            "SELECT Id FROM DuplicateRecordSet WHERE DuplicateRuleId = '0Bm1'"
        );
    }

    #[test]
    fn test_project_renders_and_sanitizes_values() {
        let query = RecordQuery::parse("Account", "Id,-,name,Owner.Name,Parent.Name,NumberOfEmployees")
            .unwrap();
        let record = record(json!({
            "attributes": {"type": "Account"},
            "Id": "001A",
            "Name": "Acme, Inc.",
            "Owner": {"attributes": {"type": "User"}, "Name": "Jane Doe"},
            "Parent": null,
            "NumberOfEmployees": 250
        }));

        let row = query.project(&record).unwrap();

        assert_eq!(
            row.values().collect::<Vec<_>>(),
            vec!["001A", "", "Acme  Inc ", "Jane Doe", "", "250"]
        );
        assert_eq!(row.get("Owner.Name"), Some("Jane Doe"));
    }

    #[test]
    fn test_project_fails_on_missing_field() {
        let query = RecordQuery::parse("Account", "Id,Website").unwrap();
        let record = record(json!({"Id": "001A"}));

        let err = query.project(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("Website"));
    }

    #[tokio::test]
    async fn test_list_follows_cursors_until_exhausted() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(
                Method::GET,
                "/query?q=",
                StatusCode::OK,
                json!({
                    "totalSize": 5,
                    "done": false,
                    "nextRecordsUrl": "/services/data/v42.0/query/01gX-4000",
                    "records": [{"Id": "a1", "Name": "One"}, {"Id": "a2", "Name": "Two"}]
                }),
            )
            .respond_json(
                Method::GET,
                "/query/01gX-2000",
                StatusCode::OK,
                json!({
                    "totalSize": 5,
                    "done": true,
                    "records": [{"Id": "a5", "Name": "Five"}]
                }),
            )
            .respond_json(
                Method::GET,
                "/query/01gX-4000",
                StatusCode::OK,
                json!({
                    "totalSize": 5,
                    "done": false,
                    "nextRecordsUrl": "/services/data/v42.0/query/01gX-2000",
                    "records": [{"Id": "a3", "Name": "Three"}, {"Id": "a4", "Name": "Four"}]
                }),
            );

        let reader = QueryReader::new(transport.clone(), ApiPaths::default());
        let query = RecordQuery::parse("Account", "Id,-,Name").unwrap();

        let rows = reader.collect_rows(&query).await.unwrap();

        let ids: Vec<_> = rows.iter().map(|row| row.get("Id").unwrap()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3", "a4", "a5"]);
        assert!(rows.iter().all(|row| row.len() == 3));

        let targets: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|recorded| recorded.request.target)
            .collect();
        assert_eq!(
            targets,
            vec![
                "/services/data/v42.0/query?q=SELECT+Id%2CName+FROM+Account".to_owned(),
                "/services/data/v42.0/query/01gX-4000".to_owned(),
                "/services/data/v42.0/query/01gX-2000".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_completes_when_rows_fall_short_of_total_size() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(
                Method::GET,
                "/query?q=",
                StatusCode::OK,
                json!({
                    "totalSize": 5,
                    "done": false,
                    "nextRecordsUrl": "/services/data/v42.0/query/01gZ-2",
                    "records": [{"Id": "a1"}, {"Id": "a2"}]
                }),
            )
            .respond_json(
                Method::GET,
                "/query/01gZ-2",
                StatusCode::OK,
                json!({
                    "totalSize": 5,
                    "done": true,
                    "records": [{"Id": "a3"}]
                }),
            );

        let reader = QueryReader::new(transport.clone(), ApiPaths::default());
        let query = RecordQuery::parse("Account", "Id").unwrap();

        let rows = reader.collect_rows(&query).await.unwrap();

        let ids: Vec<_> = rows.iter().map(|row| row.get("Id").unwrap()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(transport.pending_responses(), 0);
    }

    #[tokio::test]
    async fn test_list_is_lazy() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            Method::GET,
            "/query?q=",
            StatusCode::OK,
            json!({
                "totalSize": 3,
                "done": false,
                "nextRecordsUrl": "/services/data/v42.0/query/01gY-1",
                "records": [{"Id": "a1"}]
            }),
        );

        let reader = QueryReader::new(transport.clone(), ApiPaths::default());
        let query = RecordQuery::parse("Account", "Id").unwrap();

        let stream = reader.list(&query);
        futures::pin_mut!(stream);
        let first = stream.try_next().await.unwrap().unwrap();

        assert_eq!(first.get("Id"), Some("a1"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_list_surfaces_rejected_query() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::GET,
            "/query?q=",
            StatusCode::BAD_REQUEST,
            r#"[{"errorCode":"INVALID_FIELD","message":"No such column 'Foo'"}]"#,
        );

        let reader = QueryReader::new(transport, ApiPaths::default());
        let query = RecordQuery::parse("Account", "Foo").unwrap();

        let err = reader.collect_rows(&query).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientRequestRejected);
        assert!(err.detail().unwrap().contains("No such column"));
    }
}
