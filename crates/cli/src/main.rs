//! est CLI - evidence-based estimation and time tracking.

mod commands;
mod duration;
mod render;

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use est_calendar::BusinessCalendar;
use est_config::EstConfig;
use est_forecast::{synthetic_ratios, SYNTHETIC_COUNT};
use est_ledger::TaskLedger;
use est_storage::{EstFile, JsonStorage, Storage};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::Commands;

#[derive(Parser)]
#[command(name = "est")]
#[command(about = "Estimate tasks, track time, and forecast delivery dates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Log to stderr, filtered by `EST_LOG` (default `warn`), so stdout stays
/// clean for command output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("EST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = EstConfig::default_path()?;
    let config = EstConfig::load_or_create(&config_path)?;
    let schedule = config
        .schedule()
        .with_context(|| format!("invalid schedule in {}", config_path.display()))?;

    let estfile_path = config.estfile_path()?;
    let mut storage = JsonStorage::open(&estfile_path, || {
        EstFile::new(synthetic_ratios(&mut rand::thread_rng(), SYNTHETIC_COUNT))
    })
    .await
    .with_context(|| format!("couldn't find or create {}", estfile_path.display()))?;
    let mut file = storage
        .load()
        .await
        .with_context(|| format!("couldn't read {}", estfile_path.display()))?;

    let mutates = cli.command.mutates();
    let tasks = std::mem::take(&mut file.tasks);
    let mut ledger = TaskLedger::new(BusinessCalendar::new(schedule), tasks);

    let mut out = Vec::new();
    commands::execute(cli.command, &mut ledger, &file.synthetic_ratios, Utc::now(), &mut out)?;

    if mutates {
        file.tasks = ledger.into_tasks();
        storage.save(&file).await?;
        info!(path = %estfile_path.display(), "saved estfile");
    } else {
        debug!("read-only command, estfile unchanged");
    }

    std::io::stdout().write_all(&out)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("fatal: {:#}", e);
        std::process::exit(1);
    }
}
