//! PostgREST client implementation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::records::LastRemindedPatch;
use crate::{SupabaseError, TASK_COLUMNS, TASKS_TABLE, TaskRow, USERS_TABLE, UserRow};

/// Rows requested per page when listing tasks.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Attempts for idempotent reads: initial + 3 retries.
const READ_ATTEMPTS: u32 = 4;

/// Client for the Supabase REST API.
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl SupabaseClient {
    /// Create a new client for the given project URL and API key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, SupabaseError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size used by [`list_open_tasks`](Self::list_open_tasks).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// List every task that has not been completed, oldest first.
    ///
    /// Rows that do not decode are logged and left out.
    pub async fn list_open_tasks(&self) -> Result<Vec<TaskRow>, SupabaseError> {
        let mut all_rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_task_page(offset, self.page_size).await?;
            let fetched = page.len();
            all_rows.extend(decode_task_rows(&page));

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        debug!(count = all_rows.len(), "listed open tasks");
        Ok(all_rows)
    }

    /// Fetch one raw page of open tasks.
    async fn fetch_task_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>, SupabaseError> {
        let url = self.table_url(TASKS_TABLE);
        let query = [
            ("select", TASK_COLUMNS.to_string()),
            ("completed_at", "is.null".to_string()),
            ("order", "created_at.asc,id.asc".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];

        self.get_with_retry("list_open_tasks", &url, &query).await
    }

    /// Look up a user's email address.
    ///
    /// Returns `None` if the user does not exist or has no email on file.
    pub async fn get_user_email(&self, user_id: &str) -> Result<Option<String>, SupabaseError> {
        let url = self.table_url(USERS_TABLE);
        let query = [
            ("select", "email".to_string()),
            ("id", format!("eq.{user_id}")),
            ("limit", "1".to_string()),
        ];

        let rows: Vec<UserRow> = self.get_with_retry("get_user_email", &url, &query).await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.email)
            .filter(|email| !email.trim().is_empty()))
    }

    /// Set `last_reminded_at` on a task. Not retried.
    pub async fn set_last_reminded_at(
        &self,
        task_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SupabaseError> {
        let url = self.table_url(TASKS_TABLE);

        let response = self
            .authorized(self.http.patch(&url))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{task_id}")), ("select", "id".to_string())])
            .json(&LastRemindedPatch {
                last_reminded_at: at,
            })
            .send()
            .await?;

        let updated: Vec<serde_json::Value> = self.handle_response(response).await?;
        if updated.is_empty() {
            return Err(SupabaseError::NotFound {
                table: TASKS_TABLE.to_string(),
                id: task_id.to_string(),
            });
        }

        debug!(task_id, at = %at, "updated last_reminded_at");
        Ok(())
    }

    /// GET with retries on transient failures (500ms, 1s, 2s backoff).
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SupabaseError> {
        let mut attempt = 0;
        loop {
            let result = match self.authorized(self.http.get(url)).query(query).send().await {
                Ok(response) => self.handle_response(response).await,
                Err(e) => Err(SupabaseError::Http(e)),
            };

            match result {
                Err(ref e) if e.is_transient() && attempt + 1 < READ_ATTEMPTS => {
                    let backoff_ms = 500 * (1 << attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        backoff_ms,
                        error = %e,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                _ => return result,
            }
        }
    }

    /// Handle an HTTP response, converting errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SupabaseError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(SupabaseError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                SupabaseError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            // Try to parse as a PostgREST error
            if let Ok(api_error) = serde_json::from_str::<PostgrestError>(&text) {
                return Err(SupabaseError::Api {
                    status: status.as_u16(),
                    code: api_error.code.unwrap_or_default(),
                    message: api_error.message,
                });
            }

            return Err(SupabaseError::Api {
                status: status.as_u16(),
                code: String::new(),
                message: text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(SupabaseError::Json)
    }
}

/// Decode task rows one at a time so a single bad row cannot sink the page.
fn decode_task_rows(page: &[serde_json::Value]) -> Vec<TaskRow> {
    page.iter()
        .filter_map(|raw| match TaskRow::deserialize(raw) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(
                    task_id = %raw.get("id").unwrap_or(&serde_json::Value::Null),
                    error = %e,
                    "skipping malformed task row"
                );
                None
            }
        })
        .collect()
}

/// PostgREST error response format.
#[derive(Debug, serde::Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}
