//! Error types and result definitions for CRM operations.
//!
//! Every fallible operation in this crate returns [`CrmResult`]. A [`CrmError`] carries an
//! [`ErrorKind`] used for classification, a static description, optional dynamic detail (for
//! example the raw body returned by the platform) and the call site where it was created.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for CRM operations using [`CrmError`] as the error type.
pub type CrmResult<T> = Result<T, CrmError>;

/// Specific categories of errors that can occur while talking to the platform.
///
/// Kinds are grouped by the failure taxonomy of the client: transport failures, rejected
/// requests, state divergence between the client and the platform, and local problems.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Transport Errors
    TransportFailed,
    RequestTimedOut,

    // Rejected Requests
    ClientRequestRejected,
    ServerRequestFailed,
    AuthenticationError,

    // Bulk Job Errors
    BulkBatchFailed,
    BulkResultMismatch,
    BulkPollTimedOut,
    GroupNotBound,

    // Rule Errors
    RuleNotFound,
    RuleResolutionIncomplete,

    // Data & Validation Errors
    InvalidGroup,
    InvalidQuery,
    InvalidData,
    SerializationError,
    DeserializationError,

    // Local Errors
    ConfigError,
    IoError,
    OperationCanceled,

    // Unknown / Uncategorized
    Unknown,
}

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type for CRM operations.
///
/// Cloning is cheap: the optional source error is shared.
#[derive(Debug, Clone)]
pub struct CrmError {
    payload: Box<ErrorPayload>,
}

impl CrmError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the dynamic detail attached to this error, if any.
    ///
    /// For rejected requests this is the raw response body returned by the platform.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        CrmError {
            payload: Box::new(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
            }),
        }
    }
}

impl PartialEq for CrmError {
    fn eq(&self, other: &CrmError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.payload.detail.as_deref() {
            if detail.trim().is_empty() {
                write!(f, "\n  Detail: <empty>")?;
            } else {
                write!(f, "\n  Detail:")?;
                for line in detail.lines() {
                    write!(f, "\n    {line}")?;
                }
            }
        }

        Ok(())
    }
}

impl error::Error for CrmError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`CrmError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for CrmError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> CrmError {
        CrmError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`CrmError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for CrmError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> CrmError {
        CrmError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`CrmError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for CrmError {
    #[track_caller]
    fn from(err: std::io::Error) -> CrmError {
        let detail = err.to_string();
        CrmError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`CrmError`].
///
/// Syntax, data and EOF failures are classified as [`ErrorKind::DeserializationError`] since
/// JSON is only parsed from platform responses.
impl From<serde_json::Error> for CrmError {
    #[track_caller]
    fn from(err: serde_json::Error) -> CrmError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        CrmError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`reqwest::Error`] to [`CrmError`].
///
/// Timeouts map to [`ErrorKind::RequestTimedOut`]; every other failure to reach the platform
/// maps to [`ErrorKind::TransportFailed`]. Status codes never reach this conversion since
/// non-2xx responses are returned to callers as values.
impl From<reqwest::Error> for CrmError {
    #[track_caller]
    fn from(err: reqwest::Error) -> CrmError {
        let (kind, description) = if err.is_timeout() {
            (ErrorKind::RequestTimedOut, "Request to the platform timed out")
        } else if err.is_decode() {
            (
                ErrorKind::DeserializationError,
                "Response body could not be decoded",
            )
        } else {
            (ErrorKind::TransportFailed, "Request to the platform failed")
        };

        let detail = err.to_string();
        CrmError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, crm_error};

    #[test]
    fn test_error_carries_kind_and_detail() {
        let err = crm_error!(
            ErrorKind::BulkBatchFailed,
            "Bulk batch failed",
            "batch 751x: Failed"
        );

        assert_eq!(err.kind(), ErrorKind::BulkBatchFailed);
        assert_eq!(err.description(), "Bulk batch failed");
        assert_eq!(err.detail(), Some("batch 751x: Failed"));
    }

    #[test]
    fn test_display_renders_multiline_detail() {
        let err = CrmError::from((
            ErrorKind::ClientRequestRejected,
            "Request rejected",
            "line one\nline two".to_string(),
        ));

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ClientRequestRejected] Request rejected @ "));
        assert!(rendered.contains("\n  Detail:\n    line one\n    line two"));
    }

    #[test]
    fn test_bail_returns_early() {
        fn failing() -> CrmResult<u32> {
            bail!(ErrorKind::InvalidGroup, "Group too small");
        }

        let err = failing().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGroup);
        assert!(err.detail().is_none());
    }

    #[test]
    fn test_serde_json_error_is_deserialization_error() {
        let err: CrmError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
        assert!(error::Error::source(&err).is_some());
    }
}
