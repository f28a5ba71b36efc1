use crm::error::{CrmError, ErrorKind};
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::{self, Write};

fn backtraces_enabled() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Captured backtrace for the variants wrapping foreign errors.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the `crm` binary.
///
/// Wraps [`CrmError`] for everything that talks to the platform.
#[derive(Debug)]
pub enum CliError {
    Crm(CrmError),
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    Csv(csv::Error, CapturedBacktrace),
    Io(std::io::Error, CapturedBacktrace),
}

impl CliError {
    /// Short label grouping errors by where they went wrong.
    pub fn category(&self) -> &'static str {
        match self {
            CliError::Crm(err) => match err.kind() {
                ErrorKind::TransportFailed | ErrorKind::RequestTimedOut => "connection error",
                ErrorKind::ClientRequestRejected
                | ErrorKind::ServerRequestFailed
                | ErrorKind::AuthenticationError => "platform error",
                ErrorKind::BulkBatchFailed
                | ErrorKind::BulkResultMismatch
                | ErrorKind::BulkPollTimedOut
                | ErrorKind::GroupNotBound => "bulk job error",
                ErrorKind::RuleNotFound | ErrorKind::RuleResolutionIncomplete => "rule error",
                ErrorKind::OperationCanceled => "canceled",
                _ => "input error",
            },
            CliError::Config(_, _) => "configuration error",
            CliError::Csv(_, _) => "csv error",
            CliError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            CliError::Crm(_) => None,
            CliError::Config(_, cb) | CliError::Csv(_, cb) | CliError::Io(_, cb) => Some(&cb.0),
        }
    }

    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        CliError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Renders the error, its kind and origin for library errors, and its causes.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "crm failed ({})", self.category());
        let _ = writeln!(out, "error: {self}");

        if let CliError::Crm(err) = self {
            let _ = writeln!(out, "kind: {:?}", err.kind());
            let _ = writeln!(out, "raised at: {}", err.location());
        }

        let mut depth = 1usize;
        let mut source = Error::source(self);
        while let Some(err) = source {
            let _ = writeln!(out, "  {depth}: {err}");
            source = err.source();
            depth += 1;
        }

        if backtraces_enabled()
            && let Some(backtrace) = self.backtrace()
        {
            let _ = writeln!(out, "backtrace:\n{backtrace}");
        }

        out
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Crm(err) => write!(f, "{err}"),
            CliError::Config(source, _) => write!(f, "configuration error: {source}"),
            CliError::Csv(source, _) => write!(f, "csv error: {source}"),
            CliError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Crm(err) => err.source(),
            CliError::Config(source, _) => Some(source.as_ref()),
            CliError::Csv(source, _) => Some(source),
            CliError::Io(source, _) => Some(source),
        }
    }
}

impl From<CrmError> for CliError {
    fn from(err: CrmError) -> Self {
        CliError::Crm(err)
    }
}

impl From<csv::Error> for CliError {
    fn from(err: csv::Error) -> Self {
        CliError::Csv(err, CapturedBacktrace::capture())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err, CapturedBacktrace::capture())
    }
}
