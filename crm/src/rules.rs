//! Lookup of the duplicate rule every group is filed under.

use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::{ApiPaths, quote_literal};
use crate::bail;
use crate::error::{CrmResult, ErrorKind};
use crate::query::{QueryReader, Record};
use crate::transport::{Request, Transport};
use crate::types::{DUPLICATE_RULE_OBJECT, RuleId};

/// Outcome of resolving a rule by its developer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleResolution {
    /// The rule already exists.
    Existing(RuleId),
    /// The rule did not exist and was created from its name alone.
    ///
    /// The platform requires more than a name for a usable rule, so such a rule may be
    /// rejected once groups reference it.
    Provisional(RuleId),
    /// The rule does not exist and no label was given to create it.
    NotFound,
}

impl RuleResolution {
    /// Returns the rule identifier if the outcome is acceptable to the caller.
    ///
    /// A provisional rule is only accepted when `allow_provisional` is set.
    pub fn require(self, name: &str, allow_provisional: bool) -> CrmResult<RuleId> {
        match self {
            RuleResolution::Existing(id) => Ok(id),
            RuleResolution::Provisional(id) if allow_provisional => Ok(id),
            RuleResolution::Provisional(id) => bail!(
                ErrorKind::RuleResolutionIncomplete,
                "Duplicate rule was only created provisionally",
                format!("rule '{name}' ({id})")
            ),
            RuleResolution::NotFound => bail!(
                ErrorKind::RuleNotFound,
                "Duplicate rule does not exist",
                format!("rule '{name}'")
            ),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            RuleResolution::Existing(id) | RuleResolution::Provisional(id) => Some(id),
            RuleResolution::NotFound => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

/// Resolves duplicate rules by developer name.
#[derive(Debug, Clone)]
pub struct RuleResolver<T> {
    transport: T,
    paths: ApiPaths,
    reader: QueryReader<T>,
}

impl<T> RuleResolver<T>
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

    /// Looks up the rule named `name`, creating it when missing and `label` is given.
    ///
    /// Resolution is idempotent for existing rules. Creation sends only the developer name and
    /// its errors are returned unchanged.
    pub async fn resolve(&self, name: &str, label: Option<&str>) -> CrmResult<RuleResolution> {
        let soql = format!(
            "SELECT Id, MasterLabel, DeveloperName FROM {DUPLICATE_RULE_OBJECT} WHERE DeveloperName = {}",
            quote_literal(name)
        );
        let rules: Vec<Record> = self.reader.records(soql).try_collect().await?;

        if rules.len() > 1 {
            warn!(rule = name, matches = rules.len(), "rule name is ambiguous, using the first match");
        }

        if let Some(id) = rules
            .first()
            .and_then(|rule| rule.get("Id"))
            .and_then(|id| id.as_str())
        {
            info!(rule = name, rule_id = id, "duplicate rule exists");
            return Ok(RuleResolution::Existing(id.to_owned()));
        }

        let Some(label) = label else {
            info!(rule = name, "duplicate rule not found, not creating it without a label");
            return Ok(RuleResolution::NotFound);
        };

        info!(rule = name, label, "creating duplicate rule from its name");
        let created: CreatedRecord = self
            .transport
            .request(Request::post_json(
                self.paths.sobject(DUPLICATE_RULE_OBJECT),
                json!({ "DeveloperName": name }),
            ))
            .await?
            .reject_failure("Duplicate rule creation was rejected")?
            .json()?;

        warn!(
            rule = name,
            rule_id = %created.id,
            "duplicate rule was created provisionally and may not be usable"
        );

        Ok(RuleResolution::Provisional(created.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transport::ScriptedTransport;
    use reqwest::{Method, StatusCode};

    fn script_lookup(transport: &ScriptedTransport, records: serde_json::Value) {
        let total = records.as_array().map_or(0, Vec::len);
        transport.respond_json(
            Method::GET,
            "/query?q=SELECT+Id",
            StatusCode::OK,
            json!({"totalSize": total, "done": true, "records": records}),
        );
    }

    #[tokio::test]
    async fn test_existing_rule_is_returned_without_creation() {
        let transport = ScriptedTransport::new();
        script_lookup(
            &transport,
            json!([{"Id": "0Bm1", "MasterLabel": "Test Regel", "DeveloperName": "Test_Regel"}]),
        );

        let resolver = RuleResolver::new(transport.clone(), ApiPaths::default());
        let resolution = resolver.resolve("Test_Regel", Some("Test Regel")).await.unwrap();

        assert_eq!(resolution, RuleResolution::Existing("0Bm1".to_owned()));
        assert_eq!(transport.requests().len(), 1);
        assert!(
            transport.requests()[0]
                .request
                .target
                .ends_with("WHERE+DeveloperName+%3D+%27Test_Regel%27")
        );
    }

    #[tokio::test]
    async fn test_missing_rule_without_label_is_not_created() {
        let transport = ScriptedTransport::new();
        script_lookup(&transport, json!([]));

        let resolver = RuleResolver::new(transport.clone(), ApiPaths::default());
        let resolution = resolver.resolve("Test_Regel", None).await.unwrap();

        assert_eq!(resolution, RuleResolution::NotFound);
        assert_eq!(transport.requests().len(), 1);

        let err = resolution.require("Test_Regel", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleNotFound);
    }

    #[tokio::test]
    async fn test_missing_rule_with_label_is_created_provisionally() {
        let transport = ScriptedTransport::new();
        script_lookup(&transport, json!([]));
        transport.respond_json(
            Method::POST,
            "/sobjects/DuplicateRule/",
            StatusCode::CREATED,
            json!({"id": "0Bm9", "success": true, "errors": []}),
        );

        let resolver = RuleResolver::new(transport.clone(), ApiPaths::default());
        let resolution = resolver.resolve("Test_Regel", Some("Test Regel")).await.unwrap();

        assert_eq!(resolution, RuleResolution::Provisional("0Bm9".to_owned()));
        assert_eq!(
            transport.requests()[1].request.body,
            Some(json!({"DeveloperName": "Test_Regel"}))
        );

        let err = resolution.clone().require("Test_Regel", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleResolutionIncomplete);
        assert_eq!(resolution.require("Test_Regel", true).unwrap(), "0Bm9");
    }

    #[tokio::test]
    async fn test_rule_creation_failure_propagates() {
        let transport = ScriptedTransport::new();
        script_lookup(&transport, json!([]));
        transport.respond(
            Method::POST,
            "/sobjects/DuplicateRule/",
            StatusCode::BAD_REQUEST,
            r#"[{"message":"Required fields are missing: [SobjectType]","errorCode":"REQUIRED_FIELD_MISSING"}]"#,
        );

        let resolver = RuleResolver::new(transport, ApiPaths::default());
        let err = resolver
            .resolve("Test_Regel", Some("Test Regel"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ClientRequestRejected);
        assert!(err.detail().unwrap().contains("REQUIRED_FIELD_MISSING"));
    }

    #[tokio::test]
    async fn test_ambiguous_rule_uses_first_match() {
        let transport = ScriptedTransport::new();
        script_lookup(&transport, json!([{"Id": "0Bm1"}, {"Id": "0Bm2"}]));

        let resolver = RuleResolver::new(transport, ApiPaths::default());
        let resolution = resolver.resolve("Test_Regel", None).await.unwrap();

        assert_eq!(resolution.id(), Some("0Bm1"));
    }
}
