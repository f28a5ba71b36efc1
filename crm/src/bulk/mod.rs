//! Bulk job orchestration.
//!
//! A bulk job carries exactly one batch. [`BulkClient`] moves a [`BulkJob`] handle through
//! `Created → Submitted → Closed` and polls the batch until the platform reports a terminal
//! status, after which the [`BatchResult`] can be fetched.

mod client;
mod job;
mod poll;
mod result;

pub use client::BulkClient;
pub use job::{
    BatchStatus, BulkJob, Closed, Created, JobOperation, JobStage, JobState, Submitted,
};
pub use poll::{DEFAULT_POLL_DEADLINE, DEFAULT_POLL_INTERVAL, PollMode, PollOutcome, PollPolicy};
pub use result::{BatchResult, BatchResultRecord};
