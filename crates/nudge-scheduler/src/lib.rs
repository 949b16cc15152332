//! Recurring reminder scheduler for Nudge.
//!
//! This crate decides which recurring tasks are due for a reminder and
//! dispatches each due reminder exactly once per run:
//! - Parses compact recurrence specifications (`5m`, `3h`, `2d`)
//! - Evaluates due-ness with catch-up semantics (missed intervals collapse)
//! - Sends through an injected [`NotificationSender`] and records the send in
//!   an injected [`TaskStore`]
//! - Keeps no state between runs; `last_notified_at` in the store is the only
//!   durable state

mod dispatcher;
mod error;
mod evaluator;
mod ports;
mod recurrence;
mod scheduler;
mod types;

pub use dispatcher::Dispatcher;
pub use error::{RecurrenceError, SchedulerError, SendError, StoreError};
pub use evaluator::{is_due, is_due_with, next_due_at};
pub use ports::{NotificationSender, TaskStore};
pub use recurrence::{Recurrence, RecurrenceUnit};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use types::{
    Evaluation, FailureReason, NotificationResult, Outcome, ReminderMessage, RunSummary, Task,
    TaskId, Verdict,
};
