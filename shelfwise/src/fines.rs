//! shelfwise-fines - CLI tool to view and edit the library fine policy
//!
//! Without options, prints the stored policy. `--damaged`, `--lost` and
//! `--late` update the policy and save it; `--assess-price` prints what each
//! kind of fine would cost for a book of that price.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shelfwise_core::config::StoreKind;
use shelfwise_core::fines::{FineConfiguration, FineKind};
use shelfwise_core::{open_store, Config};

#[derive(Parser)]
#[command(name = "shelfwise-fines")]
#[command(about = "View and edit the library fine policy")]
#[command(version)]
struct Args {
    /// Read and write this snapshot file instead of the configured store
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Damaged book fine, percent of the book price (0-100)
    #[arg(long)]
    damaged: Option<f64>,

    /// Lost book fine, percent of the book price (0-200)
    #[arg(long)]
    lost: Option<f64>,

    /// Late return fine per day (0-100)
    #[arg(long)]
    late: Option<f64>,

    /// Book price to assess fines against
    #[arg(long)]
    assess_price: Option<f64>,

    /// Days late, used with --assess-price
    #[arg(long, requires = "assess_price")]
    days_late: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        shelfwise_core::logging::init(&config.logging).context("failed to initialize logging")?;

    if let Some(path) = &args.snapshot {
        config.store.kind = StoreKind::Snapshot;
        config.store.snapshot_path = Some(path.clone());
    }

    let store = open_store(&config.store).context("failed to open document store")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    let stored = runtime
        .block_on(FineConfiguration::load(store.as_ref()))
        .context("failed to load fine configuration")?;
    let mut policy = match stored {
        Some(policy) => policy,
        None => {
            println!("No fine configuration stored yet, starting from zero.");
            FineConfiguration::default()
        }
    };

    let updates = [
        (FineKind::DamagedBook, args.damaged),
        (FineKind::LostBook, args.lost),
        (FineKind::LateReturn, args.late),
    ];
    let mut changed = false;
    for (kind, value) in updates {
        if let Some(value) = value {
            policy
                .set(kind, value)
                .with_context(|| format!("cannot set {}", kind.label().to_lowercase()))?;
            changed = true;
        }
    }

    if changed {
        tracing::info!(?policy, "Updating fine configuration");
        runtime
            .block_on(policy.save(store.as_ref()))
            .context("failed to save fine configuration")?;
        println!("Fine configuration saved.");
    }

    println!();
    println!("Fine policy:");
    for kind in FineKind::ALL {
        println!(
            "  {:<14} {}{}",
            kind.label(),
            format_amount(policy.value(kind)),
            kind.unit()
        );
    }

    if let Some(price) = args.assess_price {
        let days_late = args.days_late.unwrap_or(0);
        println!();
        println!(
            "Assessment for a book priced {} ({} day(s) late):",
            format_amount(price),
            days_late
        );
        for kind in FineKind::ALL {
            let amount = policy
                .assess(kind, price, days_late)
                .context("cannot assess fine")?;
            println!("  {:<14} {}", kind.label(), format_amount(amount));
        }
    }

    Ok(())
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
