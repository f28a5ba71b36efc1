use serde::Deserialize;

use crate::shared::ValidationError;

/// Where duplicate groups are filed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DuplicatesConfig {
    /// Developer name of the duplicate rule.
    #[serde(default = "default_rule_name")]
    pub rule_name: String,
    /// Label to create the rule under when it does not exist. Without it a missing rule is
    /// an error.
    #[serde(default)]
    pub rule_label: Option<String>,
    /// Accepts a rule which had to be created from its name alone.
    #[serde(default)]
    pub allow_provisional_rule: bool,
    /// Object type whose records are grouped.
    #[serde(default = "default_record_object")]
    pub record_object: String,
    /// Maximum number of groups read from a grouping file.
    #[serde(default = "default_max_file_groups")]
    pub max_file_groups: usize,
}

impl DuplicatesConfig {
    pub const DEFAULT_RULE_NAME: &'static str = "Test_Regel";

    pub const DEFAULT_RECORD_OBJECT: &'static str = "Account";

    pub const DEFAULT_MAX_FILE_GROUPS: usize = 10;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rule_name.trim().is_empty() {
            return Err(ValidationError::invalid(
                "duplicates.rule_name",
                "must not be empty",
            ));
        }

        if self.record_object.trim().is_empty() {
            return Err(ValidationError::invalid(
                "duplicates.record_object",
                "must not be empty",
            ));
        }

        if self.max_file_groups == 0 {
            return Err(ValidationError::invalid(
                "duplicates.max_file_groups",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            rule_name: default_rule_name(),
            rule_label: None,
            allow_provisional_rule: false,
            record_object: default_record_object(),
            max_file_groups: default_max_file_groups(),
        }
    }
}

fn default_rule_name() -> String {
    DuplicatesConfig::DEFAULT_RULE_NAME.to_string()
}

fn default_record_object() -> String {
    DuplicatesConfig::DEFAULT_RECORD_OBJECT.to_string()
}

fn default_max_file_groups() -> usize {
    DuplicatesConfig::DEFAULT_MAX_FILE_GROUPS
}
