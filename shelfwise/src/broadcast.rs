//! shelfwise-broadcast - CLI tool to schedule a notification to all members
//!
//! Validates the notification locally, then hands it to the configured
//! dispatch endpoint. With `--dry-run` (or no endpoint configured) the
//! notification is only logged and printed.

use anyhow::{Context, Result};
use clap::Parser;
use shelfwise_core::notify::{dispatcher_from_config, parse_schedule, Notification};
use shelfwise_core::Config;

#[derive(Parser)]
#[command(name = "shelfwise-broadcast")]
#[command(about = "Schedule a broadcast notification to library members")]
#[command(version)]
struct Args {
    /// Notification title
    #[arg(short, long)]
    title: String,

    /// Notification body
    #[arg(short, long)]
    body: String,

    /// When to deliver, "dd/MM/yyyy HH:MM" local time
    #[arg(long)]
    at: String,

    /// Validate and print the notification without sending it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        shelfwise_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let scheduled_for = parse_schedule(&args.at)?;
    let notification = Notification::new(args.title, args.body, scheduled_for);
    notification.validate()?;
    tracing::info!(id = %notification.id, at = %args.at, dry_run = args.dry_run, "Broadcast requested");

    let dry_run = args.dry_run || config.notifications.endpoint.is_none();
    let dispatcher = dispatcher_from_config(&config.notifications, dry_run)
        .context("failed to set up notification dispatch")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;
    runtime
        .block_on(dispatcher.dispatch(&notification))
        .context("failed to dispatch notification")?;

    if dry_run {
        println!("Notification validated (dry run, not sent):");
        println!("{}", serde_json::to_string_pretty(&notification)?);
    } else {
        println!(
            "Notification {} scheduled for {}",
            notification.id, args.at
        );
    }

    Ok(())
}
