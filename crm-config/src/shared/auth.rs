use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

/// Credentials for the OAuth username/password grant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    /// Token endpoint. Defaults to the login endpoint of the active profile.
    #[serde(default)]
    pub token_url: Option<String>,
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    #[serde(default)]
    pub security_token: Option<SecretString>,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_id.trim().is_empty() {
            return Err(ValidationError::invalid("auth.client_id", "must not be empty"));
        }

        if self.username.trim().is_empty() {
            return Err(ValidationError::invalid("auth.username", "must not be empty"));
        }

        Ok(())
    }
}
