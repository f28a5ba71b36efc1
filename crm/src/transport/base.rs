use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

use crate::bail;
use crate::error::{CrmResult, ErrorKind};

/// Header used by the bulk API to carry the session token.
pub const SESSION_HEADER: &str = "X-SFDC-Session";

/// How a request authenticates against the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`, used by the REST API.
    Bearer,
    /// `X-SFDC-Session: <token>`, used by the bulk API.
    Session,
}

/// A request addressed either to a path relative to the instance URL or to an absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub auth: AuthScheme,
    /// JSON payload. Both APIs are only spoken in JSON.
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            auth: AuthScheme::Bearer,
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn post_json(target: impl Into<String>, value: Value) -> Self {
        Self {
            body: Some(value),
            ..Self::new(Method::POST, target)
        }
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }
}

/// Status code and body of a completed request.
///
/// Non-2xx responses are values like any other: callers decide how to classify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> CrmResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Fails with the raw body as detail if the status is a client or server error.
    pub fn reject_failure(self, description: &'static str) -> CrmResult<Self> {
        if self.status.is_client_error() {
            bail!(
                ErrorKind::ClientRequestRejected,
                description,
                format!("{}: {}", self.status, self.body)
            );
        }

        if self.status.is_server_error() {
            bail!(
                ErrorKind::ServerRequestFailed,
                description,
                format!("{}: {}", self.status, self.body)
            );
        }

        Ok(self)
    }

    /// Extracts the first error message of a REST error body (`[{"message": ...}]`).
    ///
    /// Falls back to the raw body when it does not have the expected shape.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<Vec<Value>>(&self.body)
            .ok()
            .and_then(|errors| {
                errors
                    .first()
                    .and_then(|error| error.get("message"))
                    .and_then(|message| message.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| self.body.clone())
    }
}

/// Issues authenticated requests against the platform.
///
/// Implementations enforce a fixed timeout and never retry. Failing to reach the platform is
/// an error; receiving any status code is not.
pub trait Transport {
    fn request(&self, request: Request) -> impl Future<Output = CrmResult<Response>> + Send;
}
