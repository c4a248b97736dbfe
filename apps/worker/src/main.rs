use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use uppe_worker::Config;
use uppe_worker::logs::{LogRotator, LogStore};
use uppe_worker::monitoring::{HttpPinger, MonitoringScheduler, OutcomeProcessor};
use uppe_worker::notifier::{LogNotifier, Notifier, TwilioNotifier};
use uppe_worker::store::FileStore;

/// Background monitoring worker for Uppe
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/uppe/worker.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_ref()).context("Failed to load configuration")?;
    info!("{config}");

    let store = Arc::new(FileStore::new(&config.storage.data_dir));
    let logs = Arc::new(LogStore::new(&config.storage.log_dir));

    let notifier: Arc<dyn Notifier> = match config.twilio_settings() {
        Some(settings) => {
            Arc::new(TwilioNotifier::new(settings).context("Failed to build SMS notifier")?)
        }
        None => Arc::new(LogNotifier),
    };

    let pinger = Arc::new(HttpPinger::new().context("Failed to build HTTP client")?);
    let processor = Arc::new(OutcomeProcessor::new(
        store.clone(),
        Arc::clone(&logs),
        notifier,
        config.storage.checks_category.clone(),
    ));

    let scheduler =
        Arc::new(MonitoringScheduler::new(store, pinger, processor, config.scheduler_settings()));
    let rotator = Arc::new(LogRotator::new(logs, config.rotation_interval()));

    let sweeps = scheduler.start();
    let rotations = rotator.start_periodic_rotation();

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutting down background workers");

    sweeps.abort();
    rotations.abort();

    Ok(())
}
