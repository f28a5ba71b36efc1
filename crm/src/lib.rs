pub mod api;
pub mod auth;
pub mod bulk;
pub mod error;
pub mod grouping;
mod macros;
pub mod query;
pub mod records;
pub mod rules;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;
pub mod types;
