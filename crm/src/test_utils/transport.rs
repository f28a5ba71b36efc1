use reqwest::{Method, StatusCode};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::bail;
use crate::error::{CrmResult, ErrorKind};
use crate::transport::{Request, Response, Transport};

#[derive(Debug)]
struct Route {
    method: Method,
    target_fragment: String,
    response: Response,
}

/// A request seen by [`ScriptedTransport`] with the (possibly paused) tokio time it arrived at.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: Request,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    routes: VecDeque<Route>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`Transport`] replaying scripted responses.
///
/// Each request consumes the first scripted response whose method matches and whose target
/// fragment is contained in the request target, so responses for the same endpoint are
/// replayed in the order they were scripted. A request without a matching response fails with
/// [`ErrorKind::TransportFailed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a response for the next request matching `method` and `target_fragment`.
    pub fn respond(
        &self,
        method: Method,
        target_fragment: impl Into<String>,
        status: StatusCode,
        body: impl Into<String>,
    ) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.routes.push_back(Route {
            method,
            target_fragment: target_fragment.into(),
            response: Response::new(status, body),
        });

        self
    }

    /// Scripts a JSON response.
    pub fn respond_json(
        &self,
        method: Method,
        target_fragment: impl Into<String>,
        status: StatusCode,
        body: serde_json::Value,
    ) -> &Self {
        self.respond(method, target_fragment, status, body.to_string())
    }

    /// Returns every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Returns the requests whose target contains `target_fragment`.
    pub fn requests_to(&self, target_fragment: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|recorded| recorded.request.target.contains(target_fragment))
            .collect()
    }

    /// Number of scripted responses not consumed yet.
    pub fn pending_responses(&self) -> usize {
        self.inner.lock().unwrap().routes.len()
    }
}

impl Transport for ScriptedTransport {
    fn request(&self, request: Request) -> impl Future<Output = CrmResult<Response>> + Send {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(RecordedRequest {
                request: request.clone(),
                at: Instant::now(),
            });

            let position = inner.routes.iter().position(|route| {
                route.method == request.method && request.target.contains(&route.target_fragment)
            });

            match position.and_then(|position| inner.routes.remove(position)) {
                Some(route) => Ok(route.response),
                None => Err(request),
            }
        };

        async move {
            match result {
                Ok(response) => Ok(response),
                Err(request) => bail!(
                    ErrorKind::TransportFailed,
                    "No scripted response for request",
                    format!("{} {}", request.method, request.target)
                ),
            }
        }
    }
}
