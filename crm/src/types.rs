//! Identifier types shared across the client.

/// Platform-issued identifier of a single record. Immutable once issued.
pub type RecordId = String;

/// Platform-issued identifier of a duplicate rule.
pub type RuleId = String;

/// Platform-issued identifier of a duplicate record set (a group).
pub type GroupId = String;

/// Platform-issued identifier of a bulk job.
pub type JobId = String;

/// Platform-issued identifier of the batch submitted to a bulk job.
pub type BatchId = String;

/// Object type holding duplicate rules.
pub const DUPLICATE_RULE_OBJECT: &str = "DuplicateRule";

/// Object type holding duplicate groups.
pub const DUPLICATE_RECORD_SET_OBJECT: &str = "DuplicateRecordSet";

/// Object type holding group memberships.
pub const DUPLICATE_RECORD_ITEM_OBJECT: &str = "DuplicateRecordItem";
