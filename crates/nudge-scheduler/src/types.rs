//! Scheduler types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque task identifier, as handed out by the task store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A user-created recurring task, as read from the store for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Identifier of the user to notify.
    pub owner: String,
    /// Free-form text; becomes the reminder content.
    pub description: String,
    /// Unparsed recurrence specification. Validated per run, not on load.
    pub recurrence: String,
    pub created_at: DateTime<Utc>,
    /// Time of the most recent successful reminder.
    pub last_notified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a never-notified, open task.
    pub fn new(
        id: impl Into<TaskId>,
        owner: impl Into<String>,
        description: impl Into<String>,
        recurrence: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            description: description.into(),
            recurrence: recurrence.into(),
            created_at,
            last_notified_at: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// What the evaluation step decided for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// At least one full interval has elapsed; dispatch a reminder.
    Due { due_since: DateTime<Utc> },
    /// Not yet due. `None` when the next due time is unrepresentable.
    NotDue { next_due_at: Option<DateTime<Utc>> },
    /// The recurrence specification did not parse.
    InvalidRecurrence { reason: String },
    /// The task is completed and is never due.
    Completed,
    /// The same task id was already seen earlier in this fetch.
    Duplicate,
}

/// A task together with its evaluation verdict.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub task: Task,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl Evaluation {
    pub fn is_due(&self) -> bool {
        matches!(self.verdict, Verdict::Due { .. })
    }
}

/// Why a dispatch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The owner has no resolvable notification address.
    NoAddress,
    /// The notification transport or provider failed, or timed out.
    SendError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAddress => f.write_str("no notification address"),
            Self::SendError(e) => write!(f, "send error: {e}"),
        }
    }
}

/// Per-task outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The reminder went out. `state_recorded` is false when the follow-up
    /// `last_notified_at` update failed, which can cause one duplicate
    /// reminder on the next run.
    Sent { state_recorded: bool },
    /// Evaluated and not due; nothing was dispatched.
    NotDue { next_due_at: Option<DateTime<Utc>> },
    SkippedInvalidRecurrence { reason: String },
    Failed { reason: FailureReason },
    /// Completed task that reached the scheduler anyway.
    Completed,
    /// Repeated task id within one fetch; only the first copy is dispatched.
    DuplicateTask,
}

impl Verdict {
    /// The final outcome for verdicts that need no dispatch.
    ///
    /// Returns `None` for [`Verdict::Due`]; its outcome comes from the dispatcher.
    pub fn settled_outcome(&self) -> Option<Outcome> {
        match self {
            Verdict::Due { .. } => None,
            Verdict::NotDue { next_due_at } => Some(Outcome::NotDue {
                next_due_at: *next_due_at,
            }),
            Verdict::InvalidRecurrence { reason } => Some(Outcome::SkippedInvalidRecurrence {
                reason: reason.clone(),
            }),
            Verdict::Completed => Some(Outcome::Completed),
            Verdict::Duplicate => Some(Outcome::DuplicateTask),
        }
    }
}

/// Result for one processed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl NotificationResult {
    pub fn new(task_id: TaskId, outcome: Outcome) -> Self {
        Self { task_id, outcome }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, Outcome::Sent { .. })
    }
}

/// Counts per outcome kind for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub sent: usize,
    /// Sent, but `last_notified_at` could not be recorded.
    pub unrecorded: usize,
    pub not_due: usize,
    pub invalid_recurrence: usize,
    pub no_address: usize,
    pub send_errors: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_results(results: &[NotificationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match &result.outcome {
                Outcome::Sent { state_recorded } => {
                    summary.sent += 1;
                    if !state_recorded {
                        summary.unrecorded += 1;
                    }
                }
                Outcome::NotDue { .. } => summary.not_due += 1,
                Outcome::SkippedInvalidRecurrence { .. } => summary.invalid_recurrence += 1,
                Outcome::Failed {
                    reason: FailureReason::NoAddress,
                } => summary.no_address += 1,
                Outcome::Failed {
                    reason: FailureReason::SendError(_),
                } => summary.send_errors += 1,
                Outcome::Completed | Outcome::DuplicateTask => summary.skipped += 1,
            }
        }

        summary
    }

    pub fn failed(&self) -> usize {
        self.no_address + self.send_errors
    }
}

/// A rendered reminder, ready for a [`NotificationSender`](crate::NotificationSender).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    /// The raw task description, for senders that render their own templates.
    pub description: String,
}

impl ReminderMessage {
    /// Render the reminder for a task.
    pub fn for_task(task: &Task, to: impl Into<String>) -> Self {
        let description = task.description.trim();
        Self {
            to: to.into(),
            subject: format!("⏰ Reminder: {description}"),
            html_body: format!("Hey! It’s time to do: {}", escape_html(description)),
            text_body: format!("Hey! It’s time to do: {description}"),
            description: description.to_string(),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(description: &str) -> Task {
        Task::new(
            "1",
            "user-1",
            description,
            "1h",
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_new_task_is_open_and_never_notified() {
        let t = task("water plants");
        assert!(!t.is_completed());
        assert!(t.last_notified_at.is_none());
        assert_eq!(t.id, TaskId::from("1"));
    }

    #[test]
    fn test_reminder_message_template() {
        let msg = ReminderMessage::for_task(&task("  water plants "), "a@example.com");
        assert_eq!(msg.to, "a@example.com");
        assert_eq!(msg.subject, "⏰ Reminder: water plants");
        assert_eq!(msg.text_body, "Hey! It’s time to do: water plants");
        assert_eq!(msg.description, "water plants");
    }

    #[test]
    fn test_reminder_html_is_escaped() {
        let msg = ReminderMessage::for_task(&task("<b>taxes</b> & bills"), "a@example.com");
        assert_eq!(
            msg.html_body,
            "Hey! It’s time to do: &lt;b&gt;taxes&lt;/b&gt; &amp; bills"
        );
        assert!(msg.text_body.contains("<b>taxes</b>"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let result = NotificationResult::new(
            TaskId::from("42"),
            Outcome::Failed {
                reason: FailureReason::SendError("boom".to_string()),
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["task_id"], "42");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "send_error");
        assert_eq!(json["reason"]["detail"], "boom");
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            NotificationResult::new("a".into(), Outcome::Sent { state_recorded: true }),
            NotificationResult::new("b".into(), Outcome::Sent { state_recorded: false }),
            NotificationResult::new("c".into(), Outcome::NotDue { next_due_at: None }),
            NotificationResult::new(
                "d".into(),
                Outcome::SkippedInvalidRecurrence {
                    reason: "bad".to_string(),
                },
            ),
            NotificationResult::new(
                "e".into(),
                Outcome::Failed {
                    reason: FailureReason::NoAddress,
                },
            ),
            NotificationResult::new("f".into(), Outcome::DuplicateTask),
        ];

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.unrecorded, 1);
        assert_eq!(summary.not_due, 1);
        assert_eq!(summary.invalid_recurrence, 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped, 1);
    }
}
