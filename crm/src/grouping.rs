//! Materialization of duplicate groups.
//!
//! A group becomes a `DuplicateRecordSet` filed under a duplicate rule, and each of its members
//! a `DuplicateRecordItem` referencing that set. Sets have to exist before their items can be
//! created, so materializing runs two bulk insert jobs one after the other.
//!
//! The identifiers of the created sets are paired with the input groups by position: the
//! platform returns one result per submitted record, in submission order. A result count that
//! differs from the number of groups, or a set that was not created, aborts before any item is
//! submitted.

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiPaths, quote_literal};
use crate::bail;
use crate::bulk::{BatchResult, BatchResultRecord, BulkClient, PollPolicy};
use crate::error::{CrmResult, ErrorKind};
use crate::records::{DeleteReport, RecordClient};
use crate::rules::RuleResolver;
use crate::transport::Transport;
use crate::types::{
    DUPLICATE_RECORD_ITEM_OBJECT, DUPLICATE_RECORD_SET_OBJECT, GroupId, RecordId, RuleId,
};

/// Records considered duplicates of each other.
///
/// A group always has at least two members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    members: Vec<RecordId>,
}

impl DuplicateGroup {
    pub fn new(members: Vec<RecordId>) -> CrmResult<Self> {
        if members.len() < 2 {
            bail!(
                ErrorKind::InvalidGroup,
                "A duplicate group needs at least two members",
                format!("{members:?}")
            );
        }

        Ok(Self { members })
    }

    pub fn members(&self) -> &[RecordId] {
        &self.members
    }
}

/// Assignment of one record to a bound group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Membership {
    pub group_id: GroupId,
    pub record_id: RecordId,
}

impl Membership {
    fn to_item(&self) -> Value {
        json!({
            "DuplicateRecordSetId": self.group_id,
            "RecordId": self.record_id,
        })
    }
}

/// Name of the duplicate rule groups are filed under and how to resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSelection {
    pub name: String,
    /// Creates the rule under this label when it does not exist.
    pub label: Option<String>,
    /// Accepts a rule which had to be created from its name alone.
    pub allow_provisional: bool,
}

impl RuleSelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            allow_provisional: false,
        }
    }
}

/// Outcome of [`GroupingEngine::materialize`].
#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    /// Rule the groups were filed under. `None` when there was nothing to materialize.
    pub rule_id: Option<RuleId>,
    /// Bound group identifiers, in input order.
    pub group_ids: Vec<GroupId>,
    pub memberships: Vec<Membership>,
    /// Raw result of the membership job.
    pub result: Option<BatchResult>,
    /// Memberships the platform refused, with their position in `memberships`.
    pub failures: Vec<(usize, BatchResultRecord)>,
}

/// Pairs the results of the group job with the submitted groups.
///
/// Fails if the number of results differs from `expected` or if a group was not created.
pub fn bind_groups(result: &BatchResult, expected: usize) -> CrmResult<Vec<GroupId>> {
    let records = result.records()?;
    if records.len() != expected {
        bail!(
            ErrorKind::BulkResultMismatch,
            "Group job returned a different number of results than groups submitted",
            format!(
                "batch '{}': submitted {expected}, returned {}",
                result.batch_id,
                records.len()
            )
        );
    }

    records
        .into_iter()
        .enumerate()
        .map(|(position, record)| match record.id {
            Some(id) if record.success => Ok(id),
            _ => bail!(
                ErrorKind::GroupNotBound,
                "Group was not created",
                format!(
                    "batch '{}', group {position}: {}",
                    result.batch_id,
                    record.errors.join("; ")
                )
            ),
        })
        .collect()
}

/// Builds one membership per member, pairing `group_ids` with `groups` by position.
pub fn build_memberships(
    group_ids: &[GroupId],
    groups: &[DuplicateGroup],
) -> CrmResult<Vec<Membership>> {
    if group_ids.len() != groups.len() {
        bail!(
            ErrorKind::BulkResultMismatch,
            "Bound group identifiers do not match the groups",
            format!("{} identifiers for {} groups", group_ids.len(), groups.len())
        );
    }

    Ok(group_ids
        .iter()
        .zip(groups)
        .flat_map(|(group_id, group)| {
            group.members().iter().map(move |record_id| Membership {
                group_id: group_id.clone(),
                record_id: record_id.clone(),
            })
        })
        .collect())
}

/// Files duplicate groups under a rule.
#[derive(Debug, Clone)]
pub struct GroupingEngine<T> {
    rule: RuleSelection,
    rules: RuleResolver<T>,
    records: RecordClient<T>,
    bulk: BulkClient<T>,
}

impl<T> GroupingEngine<T>
where
    T: Transport + Clone + Sync,
{
    pub fn new(transport: T, paths: ApiPaths, rule: RuleSelection) -> Self {
        Self {
            rule,
            rules: RuleResolver::new(transport.clone(), paths.clone()),
            records: RecordClient::new(transport.clone(), paths.clone()),
            bulk: BulkClient::new(transport, paths),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.bulk = self.bulk.with_poll_policy(policy);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.bulk = self.bulk.with_cancellation(cancellation);
        self
    }

    async fn rule_id(&self, label: Option<&str>) -> CrmResult<RuleId> {
        self.rules
            .resolve(&self.rule.name, label)
            .await?
            .require(&self.rule.name, self.rule.allow_provisional)
    }

    /// Creates one set per group and one item per member through two bulk jobs.
    ///
    /// No job is started for an empty input. A failed set aborts before the membership job;
    /// refused memberships are reported without failing.
    pub async fn materialize(&self, groups: &[DuplicateGroup]) -> CrmResult<MaterializeReport> {
        if groups.is_empty() {
            info!("no duplicate groups to materialize");
            return Ok(MaterializeReport::default());
        }

        let rule_id = self.rule_id(self.rule.label.as_deref()).await?;

        let sets = groups
            .iter()
            .map(|_| json!({ "DuplicateRuleId": rule_id }))
            .collect();
        let set_result = self
            .bulk
            .insert_records(DUPLICATE_RECORD_SET_OBJECT, sets)
            .await?;
        let group_ids = bind_groups(&set_result, groups.len())?;
        info!(groups = group_ids.len(), %rule_id, "bound duplicate groups");

        let memberships = build_memberships(&group_ids, groups)?;
        let items = memberships.iter().map(Membership::to_item).collect();
        let item_result = self
            .bulk
            .insert_records(DUPLICATE_RECORD_ITEM_OBJECT, items)
            .await?;

        let failures = item_result.failures()?;
        for (position, failure) in &failures {
            if let Some(membership) = memberships.get(*position) {
                warn!(
                    group_id = %membership.group_id,
                    record_id = %membership.record_id,
                    errors = ?failure.errors,
                    "membership was not created"
                );
            }
        }
        info!(
            memberships = memberships.len(),
            failed = failures.len(),
            "materialized duplicate groups"
        );

        Ok(MaterializeReport {
            rule_id: Some(rule_id),
            group_ids,
            memberships,
            result: Some(item_result),
            failures,
        })
    }

    /// Files the records `group` of type `object` as one group through the REST API.
    ///
    /// Every member has to exist before anything is created.
    pub async fn group_records(&self, object: &str, group: &DuplicateGroup) -> CrmResult<GroupId> {
        if !self.records.exists(object, group.members()).await? {
            bail!(
                ErrorKind::InvalidGroup,
                "Not every member of the group exists",
                format!("{object}: {:?}", group.members())
            );
        }

        let rule_id = self.rule_id(self.rule.label.as_deref()).await?;
        let group_id = self
            .records
            .create(
                DUPLICATE_RECORD_SET_OBJECT,
                json!({ "DuplicateRuleId": rule_id }),
            )
            .await?;

        for record_id in group.members() {
            let membership = Membership {
                group_id: group_id.clone(),
                record_id: record_id.clone(),
            };
            self.records
                .create(DUPLICATE_RECORD_ITEM_OBJECT, membership.to_item())
                .await?;
        }

        Ok(group_id)
    }

    /// Deletes every group filed under the rule.
    pub async fn remove_groups(&self) -> CrmResult<DeleteReport> {
        let rule_id = self.rule_id(None).await?;
        let group_ids = self
            .records
            .ids(
                DUPLICATE_RECORD_SET_OBJECT,
                Some(format!("DuplicateRuleId = {}", quote_literal(&rule_id))),
            )
            .await?;

        info!(groups = group_ids.len(), %rule_id, "removing duplicate groups");

        self.records
            .delete(DUPLICATE_RECORD_SET_OBJECT, &group_ids)
            .await
    }
}
