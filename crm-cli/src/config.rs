use crm_config::shared::CrmConfig;
use crm_config::{Profile, load_config, load_config_from};
use std::path::Path;

use crate::error::{CliError, CliResult};

/// Loads the configuration of `profile` from `directory`, or from `./configuration`.
pub fn load_crm_config(directory: Option<&Path>, profile: Profile) -> CliResult<CrmConfig> {
    match directory {
        Some(directory) => load_config_from(directory, profile),
        None => load_config(profile),
    }
    .map_err(CliError::config)
}
