use serde::Deserialize;
use std::time::Duration;

use crate::shared::ValidationError;

/// Pacing of bulk job polling.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BulkConfig {
    /// Pause between two batch status checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a batch, in milliseconds. `0` waits without limit.
    #[serde(default = "default_poll_deadline_ms")]
    pub poll_deadline_ms: u64,
}

impl BulkConfig {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

    pub const DEFAULT_POLL_DEADLINE_MS: u64 = 30 * 60 * 1_000;

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        (self.poll_deadline_ms > 0).then(|| Duration::from_millis(self.poll_deadline_ms))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::invalid(
                "bulk.poll_interval_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_deadline_ms: default_poll_deadline_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    BulkConfig::DEFAULT_POLL_INTERVAL_MS
}

fn default_poll_deadline_ms() -> u64 {
    BulkConfig::DEFAULT_POLL_DEADLINE_MS
}
