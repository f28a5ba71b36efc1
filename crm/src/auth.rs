//! Session acquisition through the OAuth username/password flow.
//!
//! A [`Session`] is valid for the duration of one run. Tokens are never refreshed.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::bail;
use crate::error::{CrmResult, ErrorKind};

/// Access token and instance URL used by every request of one run.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub instance_url: String,
}

impl Session {
    pub fn new(access_token: SecretString, instance_url: impl Into<String>) -> Self {
        Self {
            access_token,
            instance_url: instance_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

/// Credentials for the OAuth username/password grant.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    /// Appended to the password as required by the platform for untrusted networks.
    pub security_token: Option<SecretString>,
    pub timeout: Duration,
}

impl PasswordGrant {
    /// Exchanges the credentials for a [`Session`].
    pub async fn authenticate(&self) -> CrmResult<Session> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let mut password = self.password.expose_secret().clone();
        if let Some(security_token) = &self.security_token {
            password.push_str(security_token.expose_secret());
        }

        let params = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("username", self.username.as_str()),
            ("password", password.as_str()),
        ];

        let response = client.post(&self.token_url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            bail!(
                ErrorKind::AuthenticationError,
                "OAuth password grant was rejected",
                format!("{status}: {body}")
            );
        }

        let token: TokenResponse = serde_json::from_str(&body)?;

        info!(
            instance_url = %token.instance_url,
            username = %self.username,
            "authenticated against the platform"
        );

        Ok(Session {
            access_token: SecretString::new(token.access_token),
            instance_url: token.instance_url,
        })
    }
}
