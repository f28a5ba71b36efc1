use crm::auth::{PasswordGrant, Session};
use crm_config::Profile;
use crm_config::shared::{CrmConfig, ValidationError};
use tracing::info;

use crate::error::{CliError, CliResult};

/// Returns the session for this run.
///
/// A configured access token is used as is. Otherwise the password grant is run against the
/// configured token endpoint, or the default one of `profile`.
pub async fn acquire_session(config: &CrmConfig, profile: Profile) -> CliResult<Session> {
    let connection = &config.connection;
    if let (Some(access_token), Some(instance_url)) =
        (&connection.access_token, &connection.instance_url)
    {
        info!(%instance_url, "using configured access token");
        return Ok(Session::new(access_token.clone(), instance_url.clone()));
    }

    let Some(auth) = &config.auth else {
        return Err(CliError::config(ValidationError::MissingCredentials));
    };

    let grant = PasswordGrant {
        token_url: auth
            .token_url
            .clone()
            .unwrap_or_else(|| profile.default_token_url().to_owned()),
        client_id: auth.client_id.clone(),
        client_secret: auth.client_secret.clone(),
        username: auth.username.clone(),
        password: auth.password.clone(),
        security_token: auth.security_token.clone(),
        timeout: connection.request_timeout(),
    };

    Ok(grant.authenticate().await?)
}
