//! Scanner: watchlist → bars → detectors → scored picks → store

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{fetch_bars, PriceSource};
use crate::catalog::Strategy;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::scorer::{build_pick, rank_picks};
use crate::store::{PickStore, StrategyStore, WatchlistStore};
use crate::types::{Pick, TickerMeta};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Restrict to one ticker (need not be on the watchlist)
    pub ticker: Option<String>,
    /// Restrict to one strategy, by name or detector key
    pub strategy: Option<String>,
    /// Compute picks without persisting them
    #[serde(default)]
    pub dry_run: bool,
    /// Keep only the best N picks
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub signals: usize,
    pub saved: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
    pub picks: Vec<Pick>,
}

fn select_strategies(all: Vec<Strategy>, wanted: Option<&str>) -> EngineResult<Vec<Strategy>> {
    let Some(wanted) = wanted else {
        return Ok(all.into_iter().filter(|s| s.enabled).collect());
    };

    let strategy = all
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(wanted) || s.detector.key() == wanted)
        .ok_or_else(|| EngineError::UnknownStrategy(wanted.to_string()))?;

    if !strategy.enabled {
        return Err(EngineError::InvalidInput(format!(
            "strategy '{}' is disabled",
            strategy.name
        )));
    }
    Ok(vec![strategy])
}

async fn select_universe<S>(store: &S, ticker: Option<&str>) -> EngineResult<Vec<TickerMeta>>
where
    S: WatchlistStore + ?Sized,
{
    let watchlist = store.active_watchlist().await?;
    let Some(ticker) = ticker else {
        return Ok(watchlist);
    };

    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(EngineError::InvalidInput("ticker must not be empty".to_string()));
    }
    Ok(vec![watchlist
        .into_iter()
        .find(|m| m.ticker == ticker)
        .unwrap_or_else(|| TickerMeta::new(&ticker, "", false))])
}

/// Run every enabled detector over the watchlist and store the resulting picks
pub async fn run_scan<S, P>(
    store: &S,
    source: &P,
    request: &ScanRequest,
    config: &EngineConfig,
) -> EngineResult<ScanSummary>
where
    S: PickStore + StrategyStore + WatchlistStore + ?Sized,
    P: PriceSource + ?Sized,
{
    let start = Instant::now();

    if request.limit == Some(0) {
        return Err(EngineError::InvalidInput("limit must be positive".to_string()));
    }
    let strategies = select_strategies(store.strategies().await?, request.strategy.as_deref())?;
    let universe = select_universe(store, request.ticker.as_deref()).await?;

    info!(
        tickers = universe.len(),
        strategies = strategies.len(),
        dry_run = request.dry_run,
        "Starting scan"
    );

    let mut summary = ScanSummary::default();
    let mut candidates: Vec<Pick> = Vec::new();

    let chunk_size = config.chunk_size.max(1);
    let chunk_count = universe.chunks(chunk_size).len();

    for (chunk_idx, chunk) in universe.chunks(chunk_size).enumerate() {
        for meta in chunk {
            let mut bars = match fetch_bars(source, &meta.ticker, config.fetch_timeout()).await {
                Ok(Some(bars)) => bars,
                Ok(None) => {
                    warn!(ticker = %meta.ticker, "No price data, skipping");
                    summary.errors += 1;
                    continue;
                }
                Err(e) => {
                    warn!(ticker = %meta.ticker, error = %e, "Price fetch failed, skipping");
                    summary.errors += 1;
                    continue;
                }
            };
            bars.sort_by_key(|b| b.date);
            let Some(scan_date) = bars.last().map(|b| b.date) else {
                summary.errors += 1;
                continue;
            };
            summary.scanned += 1;

            for strategy in &strategies {
                if let Some(signal) = strategy.detector.detect(&bars, meta, &strategy.params()) {
                    let pick = build_pick(meta, &strategy.name, scan_date, &signal, &config.fees);
                    debug!(
                        ticker = %pick.ticker,
                        strategy = %pick.strategy_name,
                        score = pick.score,
                        "Signal"
                    );
                    candidates.push(pick);
                }
            }
        }

        if chunk_idx + 1 < chunk_count {
            tokio::time::sleep(config.chunk_pause()).await;
        }
    }

    summary.signals = candidates.len();
    rank_picks(&mut candidates);
    if let Some(limit) = request.limit {
        candidates.truncate(limit);
    }

    if !request.dry_run {
        for pick in &candidates {
            match store.insert_pick(pick).await {
                Ok(true) => summary.saved += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(pick_hash = %pick.pick_hash, error = %e, "Failed to save pick");
                    summary.errors += 1;
                }
            }
        }
    }

    summary.picks = candidates;
    summary.elapsed_ms = start.elapsed().as_millis() as u64;

    info!(
        scanned = summary.scanned,
        signals = summary.signals,
        saved = summary.saved,
        errors = summary.errors,
        elapsed_ms = summary.elapsed_ms,
        "Scan complete"
    );

    Ok(summary)
}
