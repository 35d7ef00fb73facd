//! The full run: scrape the listing, pick the top movers, then fetch, normalize
//! and chart each of them before writing the summary document.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Instrument, info, info_span, warn};

use crate::chart;
use crate::error::MoversError;
use crate::find_movers;
use crate::intraday::{IntradayClient, Price};
use crate::series;
use crate::storage_utils::{AppConfig, AsyncStorageManager, ChartConfig, PipelineConfig, SelectionConfig};
use crate::summary::{self, StockSummary};
use crate::top_k::{self, Mover};

/// What one charted symbol produced.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    /// 1-based position in the selection.
    pub rank: usize,
    pub symbol: String,
    pub change: f64,
    pub open: Price,
    pub close: Price,
    pub chart_path: PathBuf,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub reports: Vec<SymbolReport>,
    /// Symbols that were skipped, with the reason.
    pub skipped: Vec<(String, MoversError)>,
    pub summary: Vec<StockSummary>,
    pub summary_path: PathBuf,
}

pub fn build_http_client(config: &PipelineConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!("movers-charts/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

pub async fn select_movers(client: &Client, app_config: &AppConfig) -> Result<Vec<Mover>> {
    let changes = find_movers::fetch_movers(client, &app_config.listing)
        .await
        .context("failed to scrape the movers listing")?;

    let SelectionConfig {
        count,
        tie_break,
        require_full_selection,
    } = app_config.selection;

    let movers = if require_full_selection {
        top_k::top_movers_exact(changes, count, tie_break)?
    } else {
        top_k::top_movers(changes, count, tie_break)
    };
    Ok(movers)
}

/// Fetch → normalize → chart for one symbol. `slot` picks the chart theme.
async fn process_symbol(
    intraday: &IntradayClient,
    slot: usize,
    mover: &Mover,
    charts_dir: &Path,
    chart_config: &ChartConfig,
) -> Result<SymbolReport, MoversError> {
    let bars = intraday.fetch(&mover.symbol).await?;
    let normalized = series::normalize(&bars);
    let open = normalized.latest_open()?.clone();
    let close = normalized.latest_close()?.clone();

    let chart_path = charts_dir.join(format!("{}.svg", mover.symbol));
    let points = normalized.points;
    let path = chart_path.clone();
    let chart_config = chart_config.clone();
    tokio::task::spawn_blocking(move || chart::render(&points, &path, slot, &chart_config))
        .await
        .map_err(|err| MoversError::Render(format!("render task failed: {err}")))??;

    info!(bars = bars.len(), chart = %chart_path.display(), "chart written");

    Ok(SymbolReport {
        rank: slot + 1,
        symbol: mover.symbol.clone(),
        change: mover.change,
        open,
        close,
        chart_path,
    })
}

/// Runs the whole pipeline:
/// 1. Scrapes the listing and selects the top movers.
/// 2. Charts each mover, at most `pipeline.concurrency` at a time.
/// 3. Writes the summary document once every symbol is done.
pub async fn run_pipeline(
    app_config: &AppConfig,
    storage: &AsyncStorageManager,
    api_key: &str,
) -> Result<RunOutcome> {
    let client = build_http_client(&app_config.pipeline)?;

    // Step 1: Select movers
    let movers = select_movers(&client, app_config).await?;
    info!(
        selected = ?movers.iter().map(|m| m.symbol.as_str()).collect::<Vec<_>>(),
        "movers selected"
    );
    if movers.is_empty() {
        warn!("listing produced no movers");
    }

    // Step 2: Chart each mover
    let charts_dir = storage.subdir(&app_config.output.charts_dir).await?;
    let intraday = IntradayClient::new(client, &app_config.market_data, api_key);
    let concurrency = app_config.pipeline.concurrency.max(1);

    let results: Vec<(Mover, Result<SymbolReport, MoversError>)> = stream::iter(
        movers.into_iter().enumerate(),
    )
    .map(|(slot, mover)| {
        let span = info_span!("symbol", symbol = %mover.symbol, slot);
        let intraday = &intraday;
        let charts_dir = charts_dir.as_path();
        async move {
            let result =
                process_symbol(intraday, slot, &mover, charts_dir, &app_config.chart).await;
            (mover, result)
        }
        .instrument(span)
    })
    .buffered(concurrency)
    .collect()
    .await;

    // Step 3: Apply the failure policy
    let mut reports = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (mover, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) if app_config.pipeline.skip_failed_symbols => {
                warn!(symbol = %mover.symbol, error = %err, "skipping symbol");
                skipped.push((mover.symbol, err));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to process {}", mover.symbol));
            }
        }
    }

    // Step 4: Write the summary
    let symbols: Vec<&str> = reports.iter().map(|r| r.symbol.as_str()).collect();
    let opens: Vec<&Price> = reports.iter().map(|r| &r.open).collect();
    let closes: Vec<&Price> = reports.iter().map(|r| &r.close).collect();
    let summary = summary::assemble(&symbols, &opens, &closes)?;

    storage
        .save(&app_config.output.summary_name, &summary)
        .await
        .context("failed to write the summary document")?;
    let summary_path = storage.path_of(&app_config.output.summary_name);
    info!(
        charted = reports.len(),
        skipped = skipped.len(),
        path = %summary_path.display(),
        "summary written"
    );

    Ok(RunOutcome {
        reports,
        skipped,
        summary,
        summary_path,
    })
}
