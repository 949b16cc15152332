//! Nudge: recurring task reminders
//!
//! Main binary with subcommands:
//! - `run`: One reminder pass over all open tasks (invoke from cron)
//! - `check`: Validate recurrence specifications

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod check;
mod run;

/// Parse an RFC 3339 timestamp for `--now`.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", s, e))
}

#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Recurring task reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send every reminder that is due right now, then exit
    Run {
        /// Supabase project URL
        #[arg(long, env = "SUPABASE_URL")]
        supabase_url: String,

        /// Supabase API key
        #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
        supabase_key: String,

        /// Postmark server token (not needed with --dry-run)
        #[arg(long, env = "POSTMARK_SERVER_TOKEN", hide_env_values = true)]
        postmark_token: Option<String>,

        /// Sender address for reminder emails (not needed with --dry-run)
        #[arg(long, env = "FROM_EMAIL")]
        from_email: Option<String>,

        /// Postmark template alias or numeric id to render reminders with
        #[arg(long, env = "NUDGE_POSTMARK_TEMPLATE")]
        template: Option<String>,

        /// Postmark message stream
        #[arg(long, env = "NUDGE_POSTMARK_STREAM")]
        message_stream: Option<String>,

        /// Maximum reminders dispatched concurrently
        #[arg(long, env = "NUDGE_CONCURRENCY", default_value = "4")]
        concurrency: usize,

        /// Timeout in seconds for each lookup, send and update
        #[arg(long, env = "NUDGE_CALL_TIMEOUT_SECS", default_value = "10")]
        call_timeout_secs: u64,

        /// Evaluate as of this time instead of the current time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        now: Option<DateTime<Utc>>,

        /// Report which tasks are due without sending anything
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error if any reminder failed
        #[arg(long)]
        strict: bool,
    },

    /// Validate recurrence specifications such as 30m, 12h or 7d
    Check {
        /// Specifications to validate
        #[arg(value_name = "RECURRENCE", required = true)]
        specs: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for reports
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "nudge=info,nudge_scheduler=info,nudge_supabase=info,nudge_postmark=info"
                    .to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            supabase_url,
            supabase_key,
            postmark_token,
            from_email,
            template,
            message_stream,
            concurrency,
            call_timeout_secs,
            now,
            dry_run,
            json,
            strict,
        } => {
            run::run(run::RunOptions {
                supabase_url,
                supabase_key,
                postmark_token,
                from_email,
                template,
                message_stream,
                concurrency,
                call_timeout_secs,
                now,
                dry_run,
                json,
                strict,
            })
            .await
        }

        Commands::Check { specs } => check::run(&specs),
    }
}
