//! External collaborators the scheduler is built against.
//!
//! Both are injected as trait objects so a run can be exercised against
//! in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{ReminderMessage, SendError, StoreError, Task, TaskId};

/// The task/user store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch every task whose `completed_at` is absent, in a stable order.
    async fn fetch_open_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Resolve a task owner to a notification address.
    ///
    /// `Ok(None)` means the owner exists but has no address on file.
    async fn resolve_address(&self, owner: &str) -> Result<Option<String>, StoreError>;

    /// Record that a reminder for `task_id` was sent at `at`.
    async fn record_notified(&self, task_id: &TaskId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// The notification transport.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one reminder.
    async fn send(&self, message: &ReminderMessage) -> Result<(), SendError>;
}
