use serde::Deserialize;

use crate::Config;
use crate::shared::{AuthConfig, BulkConfig, ConnectionConfig, DuplicatesConfig, ValidationError};

/// Complete configuration of the CRM client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CrmConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Password grant credentials, used when no access token is configured.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
}

impl Config for CrmConfig {
    /// Validates every section and checks that some way to authenticate is configured.
    fn validate(&self) -> Result<(), ValidationError> {
        self.connection.validate()?;
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        self.bulk.validate()?;
        self.duplicates.validate()?;

        if self.connection.access_token.is_none() && self.auth.is_none() {
            return Err(ValidationError::MissingCredentials);
        }

        Ok(())
    }
}
