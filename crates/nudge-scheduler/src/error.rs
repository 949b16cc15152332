//! Error types for the scheduler.

use std::time::Duration;

use thiserror::Error;

/// A recurrence specification that cannot be turned into a positive interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    /// The specification is empty.
    #[error("recurrence is empty")]
    Empty,

    /// The specification does not match `<digits><m|h|d>`.
    #[error("malformed recurrence {0:?}: expected digits followed by m, h or d")]
    Malformed(String),

    /// The interval is zero.
    #[error("recurrence {0:?} has a zero interval")]
    Zero(String),

    /// The numeric part does not fit.
    #[error("recurrence {0:?} is out of range")]
    OutOfRange(String),
}

/// Errors returned by a [`TaskStore`](crate::TaskStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the request.
    #[error("task store error: {0}")]
    Backend(String),

    /// The request did not finish in time.
    #[error("task store request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by a [`NotificationSender`](crate::NotificationSender).
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport failed before the provider accepted the message.
    #[error("notification transport error: {0}")]
    Transport(String),

    /// The provider refused the message.
    #[error("notification rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The send did not finish in time.
    #[error("notification send timed out after {0:?}")]
    Timeout(Duration),
}

/// Run-level errors. Per-task problems never surface here.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The initial bulk read of candidate tasks failed.
    #[error("failed to fetch candidate tasks: {0}")]
    StoreFetch(#[source] StoreError),

    /// Invalid scheduler configuration.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}
