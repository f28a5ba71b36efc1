use std::time::Duration;

use crate::bulk::job::BatchStatus;

/// Default pause between two batch status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time a blocking poll waits for a batch before giving up.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Whether polling waits for a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Check once and report a batch that is still running as pending.
    Once,
    /// Check repeatedly, pausing between checks, until the batch completes or fails.
    Blocking,
}

/// Result of a successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    /// The batch is still queued or in progress. Only returned by [`PollMode::Once`].
    Pending(BatchStatus),
}

/// Pacing of blocking polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed pause between two checks.
    pub interval: Duration,
    /// Maximum time a blocking poll waits. `None` waits for as long as the batch runs.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: Some(DEFAULT_POLL_DEADLINE),
        }
    }
}
