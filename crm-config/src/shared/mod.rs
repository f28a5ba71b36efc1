//! Configuration types of the CRM client.

mod auth;
mod base;
mod bulk;
mod connection;
mod crm;
mod duplicates;

pub use auth::AuthConfig;
pub use base::ValidationError;
pub use bulk::BulkConfig;
pub use connection::ConnectionConfig;
pub use crm::CrmConfig;
pub use duplicates::DuplicatesConfig;
