mod base;
mod http;

pub use base::{AuthScheme, Request, Response, SESSION_HEADER, Transport};
pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpTransport};
