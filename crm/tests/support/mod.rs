use crm::api::ApiPaths;
use crm::auth::Session;
use crm::transport::{DEFAULT_REQUEST_TIMEOUT, HttpTransport};
use secrecy::SecretString;
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "00Dx0000000TEST!token";

/// Starts a mock org and a transport pointed at it.
pub async fn spawn_org() -> (MockServer, HttpTransport) {
    crm_telemetry::tracing::init_test_tracing();

    let server = MockServer::start().await;
    let session = Session::new(SecretString::new(ACCESS_TOKEN.to_owned()), server.uri());
    let transport = HttpTransport::new(session, DEFAULT_REQUEST_TIMEOUT).unwrap();

    (server, transport)
}

pub fn paths() -> ApiPaths {
    ApiPaths::default()
}
