//! One scheduler run: fetch, evaluate, dispatch, report.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::evaluator::evaluate;
use crate::{
    Dispatcher, Evaluation, NotificationResult, NotificationSender, RunSummary, SchedulerError,
    StoreError, Task, TaskStore, Verdict,
};

/// Default number of dispatches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default timeout for a single address lookup, send or state update.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Default timeout for the initial bulk fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum concurrent dispatches. Must be at least 1.
    pub concurrency: usize,
    /// Bound on each per-task external call.
    pub call_timeout: Duration,
    /// Bound on the bulk fetch of candidate tasks.
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<(), SchedulerError> {
        if self.concurrency == 0 {
            return Err(SchedulerError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() || self.fetch_timeout.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The reminder scheduler.
///
/// Holds no state between runs and assumes runs never overlap.
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    dispatcher: Dispatcher,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new(
        store: Arc<dyn TaskStore>,
        sender: Arc<dyn NotificationSender>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let dispatcher = Dispatcher::new(store.clone(), sender, config.call_timeout);
        Ok(Self {
            store,
            dispatcher,
            config,
        })
    }

    /// Fetch and evaluate every candidate task without dispatching anything.
    #[tracing::instrument(skip(self))]
    pub async fn plan(&self, now: DateTime<Utc>) -> Result<Vec<Evaluation>, SchedulerError> {
        let tasks = self.fetch_tasks().await?;
        let plan = evaluate_all(tasks, now);

        info!(
            fetched = plan.len(),
            due = plan.iter().filter(|e| e.is_due()).count(),
            "evaluated candidate tasks"
        );
        Ok(plan)
    }

    /// Execute one run.
    ///
    /// Returns one result per fetched task, in fetch order. Only a failed
    /// fetch fails the run; every per-task problem becomes a result entry.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<NotificationResult>, SchedulerError> {
        let plan = self.plan(now).await?;
        let permits = Semaphore::new(self.config.concurrency);

        let results = join_all(plan.iter().map(|evaluation| {
            let permits = &permits;
            async move {
                if let Some(outcome) = evaluation.verdict.settled_outcome() {
                    return NotificationResult::new(evaluation.task.id.clone(), outcome);
                }
                // The semaphore is never closed
                let _permit = permits.acquire().await.ok();
                self.dispatcher.process(&evaluation.task, now).await
            }
        }))
        .await;

        let summary = RunSummary::from_results(&results);
        info!(
            total = summary.total,
            sent = summary.sent,
            unrecorded = summary.unrecorded,
            not_due = summary.not_due,
            invalid_recurrence = summary.invalid_recurrence,
            failed = summary.failed(),
            "reminder run complete"
        );
        if summary.unrecorded > 0 {
            warn!(
                count = summary.unrecorded,
                "some reminders were sent without recording last_notified_at"
            );
        }

        Ok(results)
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>, SchedulerError> {
        let fetched = timeout(self.config.fetch_timeout, self.store.fetch_open_tasks())
            .await
            .unwrap_or(Err(StoreError::Timeout(self.config.fetch_timeout)));

        fetched.map_err(SchedulerError::StoreFetch)
    }
}

/// Evaluate every task in fetch order. Repeated ids keep only the first copy.
fn evaluate_all(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Evaluation> {
    let mut seen = HashSet::with_capacity(tasks.len());

    tasks
        .into_iter()
        .map(|task| {
            let verdict = if seen.insert(task.id.clone()) {
                evaluate(&task, now)
            } else {
                warn!(task_id = %task.id, "task id fetched twice, skipping repeat");
                Verdict::Duplicate
            };
            if let Verdict::InvalidRecurrence { reason } = &verdict {
                warn!(task_id = %task.id, recurrence = %task.recurrence, %reason, "skipping task with invalid recurrence");
            } else {
                debug!(task_id = %task.id, ?verdict, "evaluated task");
            }
            Evaluation { task, verdict }
        })
        .collect()
}
