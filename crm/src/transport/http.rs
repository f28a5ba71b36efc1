use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::auth::Session;
use crate::error::CrmResult;
use crate::transport::base::{AuthScheme, Request, Response, SESSION_HEADER, Transport};

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// Relative targets are joined to the session's instance URL; absolute `http(s)://` targets,
/// such as continuation cursors returned by some platforms, are used as they are.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    instance_url: String,
    access_token: SecretString,
}

impl HttpTransport {
    /// Creates a transport for `session` enforcing `timeout` on every request.
    pub fn new(session: Session, timeout: Duration) -> CrmResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            instance_url: session.instance_url.trim_end_matches('/').to_owned(),
            access_token: session.access_token,
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_owned();
        }

        if target.starts_with('/') {
            format!("{}{target}", self.instance_url)
        } else {
            format!("{}/{target}", self.instance_url)
        }
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: Request) -> impl Future<Output = CrmResult<Response>> + Send {
        async move {
            let url = self.resolve(&request.target);
            let token = self.access_token.expose_secret();

            let mut builder = self.client.request(request.method.clone(), &url);
            builder = match request.auth {
                AuthScheme::Bearer => builder.header(AUTHORIZATION, format!("Bearer {token}")),
                AuthScheme::Session => builder.header(SESSION_HEADER, token.as_str()),
            };
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            debug!(method = %request.method, %url, "sending request");

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;

            debug!(method = %request.method, %url, %status, "received response");

            Ok(Response { status, body })
        }
    }
}
