//! CLI entry point for mailfan.
//!
//! All configuration is resolved before the engine starts: flags here, SMTP
//! settings from the environment. Nothing prompts interactively.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mailfan::{DeliverError, DispatchRun, Message, ScheduleSpec, Scheduler, SmtpMailer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mailfan")]
#[command(about = "Send one message to every address in a recipient list")]
struct Cli {
    /// Recipient list: .txt (one address per line) or .csv/.tsv (first column)
    #[arg(short, long)]
    recipients: PathBuf,

    /// Subject line
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Message body text
    #[arg(short, long, default_value = "", conflicts_with = "body_file")]
    body: String,

    /// Read the message body from a file instead
    #[arg(long)]
    body_file: Option<PathBuf>,

    /// Attach a file (repeatable); missing files are skipped with a warning
    #[arg(short, long = "attach", value_name = "FILE")]
    attachments: Vec<PathBuf>,

    /// Dispatch daily at this local time instead of immediately
    #[arg(long, value_name = "HH:MM")]
    daily_at: Option<ScheduleSpec>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let recipients = mailfan::read_recipients(&cli.recipients).unwrap_or_else(|e| {
        tracing::error!(error = %e, "could not read recipient list");
        Vec::new()
    });
    if recipients.is_empty() {
        bail!("no valid recipients in {}", cli.recipients.display());
    }
    tracing::info!(count = recipients.len(), "recipient list loaded");

    let body = match &cli.body_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading body file {}", path.display()))?,
        None => cli.body.clone(),
    };

    let message = Message::builder()
        .subject(cli.subject.clone())
        .body(body)
        .attach_all(cli.attachments.clone())
        .build()
        .context("building message")?;

    let mailer = SmtpMailer::from_env().context("SMTP configuration")?;

    let run = DispatchRun::new(&mailer, &message);
    let firing = || {
        let mailer = &mailer;
        let run = &run;
        let recipients = &recipients;
        async move {
            mailer.probe().await?;
            Ok::<_, DeliverError>(run.execute(recipients).await)
        }
    };

    match cli.daily_at {
        None => {
            let summary = mailfan::run_once(firing).await?;
            println!("Dispatch complete: {summary}");
        }
        Some(spec) => {
            let (scheduler, handle) = Scheduler::daily(spec);
            tokio::spawn(async move {
                shutdown_signal().await;
                handle.stop();
            });
            scheduler.run(firing).await;
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. The scheduler then exits at the next tick
/// boundary, never mid-run.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
