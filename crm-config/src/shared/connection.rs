use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use crate::shared::ValidationError;

/// How to reach the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectionConfig {
    /// Base URL of the org. Required together with `access_token`; otherwise the password
    /// grant returns it.
    #[serde(default)]
    pub instance_url: Option<String>,
    /// Pre-issued access token. Takes precedence over the `auth` section.
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_api_version")]
    pub bulk_api_version: String,
    /// Timeout applied to every request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ConnectionConfig {
    pub const DEFAULT_API_VERSION: &'static str = "42.0";

    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 25_000;

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_ms == 0 {
            return Err(ValidationError::invalid(
                "connection.request_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.api_version.trim().is_empty() {
            return Err(ValidationError::invalid(
                "connection.api_version",
                "must not be empty",
            ));
        }

        if self.bulk_api_version.trim().is_empty() {
            return Err(ValidationError::invalid(
                "connection.bulk_api_version",
                "must not be empty",
            ));
        }

        if self.access_token.is_some() && self.instance_url.is_none() {
            return Err(ValidationError::invalid(
                "connection.instance_url",
                "must be set when `access_token` is set",
            ));
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            instance_url: None,
            access_token: None,
            api_version: default_api_version(),
            bulk_api_version: default_api_version(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_api_version() -> String {
    ConnectionConfig::DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout_ms() -> u64 {
    ConnectionConfig::DEFAULT_REQUEST_TIMEOUT_MS
}
