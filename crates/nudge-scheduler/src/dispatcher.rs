//! Reminder dispatch for a single due task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    FailureReason, NotificationResult, NotificationSender, Outcome, ReminderMessage, SendError,
    Task, TaskStore,
};

/// Resolves the owner's address, sends the reminder and records the send.
///
/// Nothing is retried here; a failed send leaves the task due so the next
/// run picks it up again.
pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    sender: Arc<dyn NotificationSender>,
    call_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher. Every external call is bounded by `call_timeout`.
    pub fn new(
        store: Arc<dyn TaskStore>,
        sender: Arc<dyn NotificationSender>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            call_timeout,
        }
    }

    /// Dispatch a reminder for a task already known to be due.
    ///
    /// `last_notified_at` is only updated after a successful send.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.id, owner = %task.owner))]
    pub async fn process(&self, task: &Task, now: DateTime<Utc>) -> NotificationResult {
        let outcome = self.dispatch(task, now).await;
        NotificationResult::new(task.id.clone(), outcome)
    }

    async fn dispatch(&self, task: &Task, now: DateTime<Utc>) -> Outcome {
        let Some(address) = self.resolve_address(&task.owner).await else {
            return Outcome::Failed {
                reason: FailureReason::NoAddress,
            };
        };

        let message = ReminderMessage::for_task(task, address);
        let sent = match timeout(self.call_timeout, self.sender.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.call_timeout)),
        };

        if let Err(e) = sent {
            warn!(error = %e, "failed to send reminder, task stays due");
            return Outcome::Failed {
                reason: FailureReason::SendError(e.to_string()),
            };
        }

        info!(to = %message.to, "sent reminder");

        let recorded = match timeout(self.call_timeout, self.store.record_notified(&task.id, now))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    "reminder sent but last_notified_at was not recorded, next run may send it again"
                );
                false
            }
            Err(_) => {
                error!(
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "reminder sent but recording last_notified_at timed out, next run may send it again"
                );
                false
            }
        };

        Outcome::Sent {
            state_recorded: recorded,
        }
    }

    /// Look up the owner's address. Any failure, timeout or blank address is `None`.
    async fn resolve_address(&self, owner: &str) -> Option<String> {
        match timeout(self.call_timeout, self.store.resolve_address(owner)).await {
            Ok(Ok(Some(address))) if !address.trim().is_empty() => Some(address.trim().to_string()),
            Ok(Ok(_)) => {
                warn!("owner has no notification address");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to resolve owner address");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "owner address lookup timed out"
                );
                None
            }
        }
    }
}
