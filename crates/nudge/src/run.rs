//! The `run` command: one reminder pass.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Result;
use serde::Serialize;
use tracing::{info, warn};

use nudge_postmark::{PostmarkClient, PostmarkSender, TemplateRef};
use nudge_scheduler::{
    Evaluation, NotificationResult, NotificationSender, Outcome, ReminderMessage, RunSummary,
    Scheduler, SchedulerConfig, SendError, Verdict,
};
use nudge_supabase::SupabaseClient;

/// Options for a run, straight from the command line.
pub struct RunOptions {
    pub supabase_url: String,
    pub supabase_key: String,
    pub postmark_token: Option<String>,
    pub from_email: Option<String>,
    /// Postmark template alias or id.
    pub template: Option<String>,
    pub message_stream: Option<String>,
    pub concurrency: usize,
    pub call_timeout_secs: u64,
    /// Evaluation time; defaults to the current time.
    pub now: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub json: bool,
    /// Fail the command if any reminder failed.
    pub strict: bool,
}

/// Stands in for the real sender during a dry run, where nothing is dispatched.
struct DisabledSender;

#[async_trait]
impl NotificationSender for DisabledSender {
    async fn send(&self, _message: &ReminderMessage) -> Result<(), SendError> {
        Err(SendError::Transport("sending is disabled for dry runs".to_string()))
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    now: DateTime<Utc>,
    summary: &'a RunSummary,
    results: &'a [NotificationResult],
}

#[derive(Serialize)]
struct PlanReport<'a> {
    now: DateTime<Utc>,
    due: usize,
    tasks: &'a [Evaluation],
}

/// Run the reminder pass.
pub async fn run(options: RunOptions) -> Result<()> {
    let now = options.now.unwrap_or_else(Utc::now);

    let store = SupabaseClient::new(&options.supabase_url, &options.supabase_key)
        .map_err(|e| miette::miette!("failed to create Supabase client: {}", e))?;

    let sender: Arc<dyn NotificationSender> = if options.dry_run {
        Arc::new(DisabledSender)
    } else {
        Arc::new(build_sender(&options)?)
    };

    let config = SchedulerConfig {
        concurrency: options.concurrency,
        call_timeout: Duration::from_secs(options.call_timeout_secs),
        ..SchedulerConfig::default()
    };
    let scheduler =
        Scheduler::new(Arc::new(store), sender, config).map_err(|e| miette::miette!("{}", e))?;

    info!(now = %now, dry_run = options.dry_run, "starting reminder run");

    if options.dry_run {
        let plan = scheduler
            .plan(now)
            .await
            .map_err(|e| miette::miette!("{}", e))?;
        return print_plan(now, &plan, options.json);
    }

    let results = scheduler
        .run(now)
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    let summary = RunSummary::from_results(&results);

    print_results(now, &summary, &results, options.json)?;

    if options.strict && summary.failed() > 0 {
        return Err(miette::miette!(
            "{} of {} reminders failed",
            summary.failed(),
            summary.sent + summary.failed()
        ));
    }

    Ok(())
}

fn build_sender(options: &RunOptions) -> Result<PostmarkSender> {
    let token = options
        .postmark_token
        .as_deref()
        .ok_or_else(|| miette::miette!("--postmark-token (POSTMARK_SERVER_TOKEN) is required"))?;
    let from = options
        .from_email
        .as_deref()
        .ok_or_else(|| miette::miette!("--from-email (FROM_EMAIL) is required"))?;

    let mut client = PostmarkClient::new(token, from)
        .map_err(|e| miette::miette!("failed to create Postmark client: {}", e))?;
    if let Some(stream) = &options.message_stream {
        client = client.with_message_stream(stream);
    }

    let mut sender = PostmarkSender::new(client);
    if let Some(template) = &options.template {
        let Ok(template) = template.parse::<TemplateRef>();
        sender = sender.with_template(template);
    }

    Ok(sender)
}

fn print_results(
    now: DateTime<Utc>,
    summary: &RunSummary,
    results: &[NotificationResult],
    json: bool,
) -> Result<()> {
    if json {
        let report = RunReport {
            now,
            summary,
            results,
        };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| miette::miette!("failed to encode report: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    for result in results {
        println!("{}\t{}", result.task_id, describe_outcome(&result.outcome));
    }
    println!(
        "{} tasks: {} sent, {} not due, {} invalid recurrence, {} failed",
        summary.total,
        summary.sent,
        summary.not_due,
        summary.invalid_recurrence,
        summary.failed()
    );
    if summary.unrecorded > 0 {
        warn!(
            count = summary.unrecorded,
            "reminders sent without recording; they may repeat next run"
        );
    }
    Ok(())
}

fn print_plan(now: DateTime<Utc>, plan: &[Evaluation], json: bool) -> Result<()> {
    let due = plan.iter().filter(|e| e.is_due()).count();

    if json {
        let report = PlanReport {
            now,
            due,
            tasks: plan,
        };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| miette::miette!("failed to encode plan: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    for evaluation in plan {
        println!(
            "{}\t{}\t{}",
            evaluation.task.id,
            describe_verdict(&evaluation.verdict),
            evaluation.task.description
        );
    }
    println!("{} of {} tasks due (dry run, nothing sent)", due, plan.len());
    Ok(())
}

fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Sent {
            state_recorded: true,
        } => "sent".to_string(),
        Outcome::Sent {
            state_recorded: false,
        } => "sent (last_notified_at not recorded)".to_string(),
        Outcome::NotDue {
            next_due_at: Some(at),
        } => format!("not due until {}", at.to_rfc3339()),
        Outcome::NotDue { next_due_at: None } => "not due".to_string(),
        Outcome::SkippedInvalidRecurrence { reason } => format!("skipped: {}", reason),
        Outcome::Failed { reason } => format!("failed: {}", reason),
        Outcome::Completed => "skipped: completed".to_string(),
        Outcome::DuplicateTask => "skipped: duplicate".to_string(),
    }
}

fn describe_verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Due { due_since } => format!("due since {}", due_since.to_rfc3339()),
        Verdict::NotDue {
            next_due_at: Some(at),
        } => format!("not due until {}", at.to_rfc3339()),
        Verdict::NotDue { next_due_at: None } => "not due".to_string(),
        Verdict::InvalidRecurrence { reason } => format!("invalid: {}", reason),
        Verdict::Completed => "completed".to_string(),
        Verdict::Duplicate => "duplicate".to_string(),
    }
}
