//! shelfwise-report - CLI tool to print the library analytics dashboard
//!
//! Builds every dashboard report from the configured document store and
//! prints them as text, JSON or Markdown.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shelfwise_core::analytics::{DayFormat, Report, ReportState};
use shelfwise_core::config::StoreKind;
use shelfwise_core::{open_store, Config, LibraryDashboard, ReportPipeline};

const BAR_WIDTH: usize = 30;

#[derive(Parser)]
#[command(name = "shelfwise-report")]
#[command(about = "Print library analytics reports")]
#[command(version)]
struct Args {
    /// Read documents from this snapshot file instead of the configured store
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Last day of the weekly window (dd/MM/yyyy, defaults to today)
    #[arg(long)]
    today: Option<String>,

    /// Output format: text (default), json or md
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Fail if any record was skipped
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !matches!(args.format.as_str(), "text" | "json" | "md") {
        anyhow::bail!("Unknown format '{}' (expected text, json or md)", args.format);
    }

    let day_format = DayFormat::default();
    let today = match &args.today {
        Some(value) => day_format
            .parse(value)
            .with_context(|| format!("--today must be dd/MM/yyyy, got '{}'", value))?,
        None => Local::now().date_naive(),
    };

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        shelfwise_core::logging::init(&config.logging).context("failed to initialize logging")?;

    if let Some(path) = args.snapshot {
        config.store.kind = StoreKind::Snapshot;
        config.store.snapshot_path = Some(path);
    }

    tracing::info!(today = %day_format.key(today), format = %args.format, "Building dashboard");

    let store = open_store(&config.store).context("failed to open document store")?;
    let pipeline = ReportPipeline::from_config(store, &config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;
    let dashboard = runtime.block_on(pipeline.dashboard(today));

    if args.strict {
        check_strict(&dashboard)?;
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&dashboard)?),
        "md" => print_markdown(&dashboard, &day_format),
        _ => print_text(&dashboard, &day_format),
    }

    if dashboard.failed_count() > 0 {
        eprintln!(
            "warning: {} report(s) failed to load, see {}",
            dashboard.failed_count(),
            shelfwise_core::logging::log_file_path().display()
        );
    }

    Ok(())
}

fn check_strict(dashboard: &LibraryDashboard) -> Result<()> {
    let skipped = dashboard.skipped_total();
    if skipped == 0 {
        return Ok(());
    }

    for (title, state) in dashboard.reports() {
        for record in state.skipped() {
            eprintln!("skipped {} in {}: {}", record.id, title, record.reason);
        }
    }
    for record in &dashboard.fine_total_skipped {
        eprintln!("skipped {} in weekly fine total: {}", record.id, record.reason);
    }

    Err(shelfwise_core::Error::ParseSkipped { count: skipped })
        .context("strict mode: input contains unusable records")
}

// ============================================
// Text output
// ============================================

fn print_text(dashboard: &LibraryDashboard, day_format: &DayFormat) {
    println!(
        "Library analytics for {}",
        day_format.key(dashboard.today)
    );
    println!();
    println!("  Members:          {}", dashboard.format_member_count());
    println!(
        "  Fines this week:  {}",
        dashboard.format_weekly_fine_total()
    );

    for (title, state) in dashboard.reports() {
        println!();
        match title {
            "Weekly fines" => match dashboard.format_fines_change() {
                Some(change) => println!("{} ({} vs baseline)", title, change),
                None => println!("{}", title),
            },
            _ => println!("{}", title),
        }
        print_state_text(state);
    }
}

fn print_state_text(state: &ReportState) {
    match state {
        ReportState::Loading => println!("  Loading..."),
        ReportState::Failed { message } => println!("  Failed to load: {}", message),
        ReportState::NoData { .. } => println!("  No data available"),
        ReportState::Populated(outcome) => print_bars(&outcome.report),
    }

    let skipped = state.skipped().len();
    if skipped > 0 {
        println!(
            "  ({} record{} skipped)",
            skipped,
            if skipped == 1 { "" } else { "s" }
        );
    }
}

fn print_bars(report: &Report) {
    let label_width = report
        .points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    let max = report.max_value.unwrap_or(0.0);

    for point in &report.points {
        let width = if max > 0.0 {
            ((point.value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!(
            "  {:<label_width$}  {} {}",
            point.label,
            "█".repeat(width),
            format_value(point.value),
            label_width = label_width
        );
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

// ============================================
// Markdown output
// ============================================

fn print_markdown(dashboard: &LibraryDashboard, day_format: &DayFormat) {
    println!("# Library analytics for {}", day_format.key(dashboard.today));
    println!();
    println!("| Metric | Value |");
    println!("|---|---|");
    println!("| Members | {} |", dashboard.format_member_count());
    println!(
        "| Fines this week | {} |",
        dashboard.format_weekly_fine_total()
    );
    if let Some(change) = dashboard.format_fines_change() {
        println!("| Weekly fines trend | {} |", change);
    }

    for (title, state) in dashboard.reports() {
        println!();
        println!("## {}", title);
        println!();
        match state {
            ReportState::Loading => println!("_Loading_"),
            ReportState::Failed { message } => println!("_Failed to load: {}_", message),
            ReportState::NoData { .. } => println!("_No data available_"),
            ReportState::Populated(outcome) => {
                println!("| Label | Value |");
                println!("|---|---:|");
                for point in &outcome.report.points {
                    println!("| {} | {} |", point.label, format_value(point.value));
                }
            }
        }
        let skipped = state.skipped().len();
        if skipped > 0 {
            println!();
            println!("_{} record(s) skipped_", skipped);
        }
    }
}
