//! [`TaskStore`] implementation backed by Supabase.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nudge_scheduler::{StoreError, Task, TaskId, TaskStore};

use crate::{SupabaseClient, SupabaseError};

impl From<SupabaseError> for StoreError {
    fn from(e: SupabaseError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl TaskStore for SupabaseClient {
    async fn fetch_open_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = self.list_open_tasks().await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn resolve_address(&self, owner: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_user_email(owner).await?)
    }

    async fn record_notified(&self, task_id: &TaskId, at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(self.set_last_reminded_at(task_id.as_str(), at).await?)
    }
}
