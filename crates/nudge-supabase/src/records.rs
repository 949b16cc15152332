//! Table names and row types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use nudge_scheduler::{Task, TaskId};

/// Table holding recurring tasks.
pub const TASKS_TABLE: &str = "tasks";

/// Table holding users and their email addresses.
pub const USERS_TABLE: &str = "users";

/// Columns selected when listing tasks.
pub const TASK_COLUMNS: &str =
    "id,user_id,task,frequency,created_at,last_reminded_at,completed_at";

/// A row of the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(default)]
    pub task: Option<String>,
    /// Recurrence, e.g. `"3h"`. Not validated here.
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_reminded_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: TaskId(row.id),
            owner: row.user_id,
            description: row.task.unwrap_or_default(),
            // A missing frequency surfaces as an invalid recurrence
            recurrence: row.frequency.unwrap_or_default(),
            created_at: row.created_at,
            last_notified_at: row.last_reminded_at,
            completed_at: row.completed_at,
        }
    }
}

/// A row of the `users` table, restricted to the email column.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of the `last_reminded_at` update.
#[derive(Debug, Serialize)]
pub(crate) struct LastRemindedPatch {
    pub last_reminded_at: DateTime<Utc>,
}

/// Accept both numeric and text primary keys.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

/// Parse a `timestamptz` value, or a zone-less `timestamp` taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // PostgREST renders timestamptz as `2026-01-02T03:04:05.123456+00:00`,
            // plain timestamp columns without an offset.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|naive| naive.and_utc())
                .ok()
        })
        .or_else(|| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z")
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_task_row_from_postgrest() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": 17,
            "user_id": "6f1c2a9e-0000-4000-8000-000000000001",
            "task": "water the plants",
            "frequency": "2d",
            "created_at": "2026-01-02T03:04:05.123456+00:00",
            "last_reminded_at": null,
            "completed_at": null
        }))
        .unwrap();

        assert_eq!(row.id, "17");
        assert_eq!(row.frequency.as_deref(), Some("2d"));
        assert!(row.last_reminded_at.is_none());

        let task = Task::from(row);
        assert_eq!(task.id, TaskId::from("17"));
        assert_eq!(task.owner, "6f1c2a9e-0000-4000-8000-000000000001");
        assert_eq!(task.description, "water the plants");
        assert_eq!(task.recurrence, "2d");
        assert_eq!(
            task.created_at,
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
                + chrono::Duration::microseconds(123456)
        );
    }

    #[test]
    fn test_missing_frequency_becomes_empty_recurrence() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "t1",
            "user_id": 5,
            "frequency": null,
            "created_at": "2026-01-02T03:04:05Z"
        }))
        .unwrap();

        let task = Task::from(row);
        assert_eq!(task.owner, "5");
        assert_eq!(task.recurrence, "");
        assert_eq!(task.description, "");
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        for raw in [
            "2026-01-02T03:04:05Z",
            "2026-01-02T03:04:05+00:00",
            "2026-01-02T05:04:05+02:00",
            "2026-01-02T03:04:05",
            "2026-01-02 03:04:05",
            "2026-01-02 03:04:05+00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let result: Result<TaskRow, _> = serde_json::from_value(json!({
            "id": 1,
            "user_id": 1,
            "created_at": "not a time"
        }));
        assert!(result.is_err());
    }
}
