use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use movers_charts::storage_utils::{AppConfig, AsyncStorageManager};
use movers_charts::{logging, movers_table, pipeline};

/// Charts the top intraday movers and writes a price summary.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Storage directory for config.json, charts and the summary.
    /// Defaults to `storage/` next to the executable.
    #[arg(long, env = "MOVERS_STORAGE")]
    storage: Option<PathBuf>,

    /// Market-data provider API key.
    #[arg(long, env = "ALPHAVANTAGE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Skip the console table at the end of the run.
    #[arg(long)]
    no_table: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let storage = match &args.storage {
        Some(dir) => AsyncStorageManager::new(dir).await?,
        None => AsyncStorageManager::new_relative("storage").await?,
    };
    let config: AppConfig = storage.load_or_init("config").await?;
    info!(storage = %storage.base_dir.display(), "config loaded");

    let started_at = chrono::Utc::now();
    let outcome = match pipeline::run_pipeline(&config, &storage, &args.api_key).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            return Err(e);
        }
    };

    if !args.no_table {
        movers_table::print_table(&outcome.reports, started_at);
    }
    for (symbol, reason) in &outcome.skipped {
        eprintln!("Skipped {}: {}", symbol, reason);
    }

    Ok(())
}
