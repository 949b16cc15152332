//! Due-task evaluation.
//!
//! A task is due once a full interval has elapsed since it was last notified,
//! or since it was created if it has never been notified. Several missed
//! intervals still produce a single due decision; nothing is back-filled.

use chrono::{DateTime, Utc};

use crate::{Recurrence, RecurrenceError, Task, Verdict};

/// When the task next becomes due.
///
/// Returns `None` if the time is past the representable range, in which case
/// the task is never due.
pub fn next_due_at(
    created_at: DateTime<Utc>,
    last_notified_at: Option<DateTime<Utc>>,
    recurrence: &Recurrence,
) -> Option<DateTime<Utc>> {
    last_notified_at
        .unwrap_or(created_at)
        .checked_add_signed(recurrence.duration())
}

/// Whether a task with an already-parsed recurrence is due at `now`.
pub fn is_due_with(
    now: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_notified_at: Option<DateTime<Utc>>,
    recurrence: &Recurrence,
) -> bool {
    next_due_at(created_at, last_notified_at, recurrence).is_some_and(|due| now >= due)
}

/// Whether a task is due at `now`.
///
/// Fails only if `recurrence` does not parse. Completion is not considered;
/// callers exclude completed tasks beforehand.
pub fn is_due(
    now: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_notified_at: Option<DateTime<Utc>>,
    recurrence: &str,
) -> Result<bool, RecurrenceError> {
    let recurrence = Recurrence::parse(recurrence)?;
    Ok(is_due_with(now, created_at, last_notified_at, &recurrence))
}

/// Evaluate a single task. Completed tasks are settled without parsing.
pub(crate) fn evaluate(task: &Task, now: DateTime<Utc>) -> Verdict {
    if task.is_completed() {
        return Verdict::Completed;
    }

    let recurrence = match Recurrence::parse(&task.recurrence) {
        Ok(r) => r,
        Err(e) => {
            return Verdict::InvalidRecurrence {
                reason: e.to_string(),
            };
        }
    };

    match next_due_at(task.created_at, task.last_notified_at, &recurrence) {
        Some(due) if now >= due => Verdict::Due { due_since: due },
        next_due_at => Verdict::NotDue { next_due_at },
    }
}
