//! Outcome resolver
//!
//! Walks pending picks forward through the bars that followed their scan day
//! and settles each one as winner, loser or expired. A bar that touches both
//! levels counts as a stop-out.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::api::{fetch_bars, PriceSource};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::PickStore;
use crate::types::{round2, Bar, Outcome, Pick};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub lookback_days: i64,
    pub max_hold_days: i64,
}

impl Default for ResolveRequest {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            max_hold_days: 10,
        }
    }
}

impl ResolveRequest {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            max_hold_days: config.max_hold_days,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        if self.lookback_days < 0 {
            return Err(EngineError::InvalidInput(format!(
                "lookback_days must not be negative, got {}",
                self.lookback_days
            )));
        }
        if self.max_hold_days <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "max_hold_days must be positive, got {}",
                self.max_hold_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveSummary {
    pub checked: usize,
    pub winners: usize,
    pub losers: usize,
    pub expired: usize,
    pub still_pending: usize,
    /// Picks another run settled between our read and our write
    pub already_settled: usize,
    pub errors: usize,
}

/// A settled outcome for one pick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: Outcome,
    pub price: f64,
    pub pct: f64,
    pub date: NaiveDate,
}

impl Resolution {
    fn new(pick: &Pick, outcome: Outcome, price: f64, date: NaiveDate) -> Self {
        Self {
            outcome,
            price,
            pct: round2((price - pick.entry_price) / pick.entry_price * 100.0),
            date,
        }
    }
}

/// Decide a pick's outcome from the bars available today, or `None` if it stays pending
pub fn evaluate(pick: &Pick, bars: &[Bar], today: NaiveDate, max_hold_days: i64) -> Option<Resolution> {
    let hold = u64::try_from(max_hold_days).ok()?;
    let horizon = pick.scan_date.checked_add_days(Days::new(hold))?;

    let mut after: Vec<&Bar> = bars.iter().filter(|b| b.date > pick.scan_date).collect();
    after.sort_by_key(|b| b.date);

    let window: Vec<&Bar> = after.iter().copied().filter(|b| b.date <= horizon).collect();

    for bar in &window {
        if bar.low <= pick.stop_loss_price {
            return Some(Resolution::new(pick, Outcome::Loser, pick.stop_loss_price, bar.date));
        }
        if bar.high >= pick.take_profit_price {
            return Some(Resolution::new(pick, Outcome::Winner, pick.take_profit_price, bar.date));
        }
    }

    if (today - pick.scan_date).num_days() < max_hold_days {
        return None;
    }

    let last = window.last().or(after.last())?;
    Some(Resolution::new(pick, Outcome::Expired, last.close, last.date))
}

/// Resolve every pending pick scanned within the lookback window
pub async fn resolve_pending<S, P>(
    store: &S,
    source: &P,
    request: &ResolveRequest,
    config: &EngineConfig,
    today: NaiveDate,
) -> EngineResult<ResolveSummary>
where
    S: PickStore + ?Sized,
    P: PriceSource + ?Sized,
{
    request.validate()?;

    let since = today
        .checked_sub_days(Days::new(request.lookback_days as u64))
        .unwrap_or(NaiveDate::MIN);
    let pending = store.pending_picks_since(since).await?;

    let mut by_ticker: BTreeMap<String, Vec<Pick>> = BTreeMap::new();
    for pick in pending {
        by_ticker.entry(pick.ticker.clone()).or_default().push(pick);
    }

    let mut summary = ResolveSummary::default();
    info!(
        picks = by_ticker.values().map(Vec::len).sum::<usize>(),
        tickers = by_ticker.len(),
        "Resolving pending picks"
    );

    let tickers: Vec<String> = by_ticker.keys().cloned().collect();
    let chunk_count = tickers.chunks(config.chunk_size.max(1)).len();

    for (chunk_idx, chunk) in tickers.chunks(config.chunk_size.max(1)).enumerate() {
        for ticker in chunk {
            let picks = by_ticker.get(ticker).map(Vec::as_slice).unwrap_or_default();
            summary.checked += picks.len();

            let bars = match fetch_bars(source, ticker, config.fetch_timeout()).await {
                Ok(Some(bars)) => bars,
                Ok(None) => {
                    warn!(ticker = %ticker, "No price data, picks stay pending");
                    summary.errors += 1;
                    summary.still_pending += picks.len();
                    continue;
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Price fetch failed, picks stay pending");
                    summary.errors += 1;
                    summary.still_pending += picks.len();
                    continue;
                }
            };

            for pick in picks {
                let Some(resolution) = evaluate(pick, &bars, today, request.max_hold_days) else {
                    summary.still_pending += 1;
                    continue;
                };

                match store
                    .record_outcome(
                        &pick.pick_hash,
                        resolution.outcome,
                        resolution.price,
                        resolution.pct,
                        resolution.date,
                    )
                    .await
                {
                    Ok(true) => {
                        debug!(
                            ticker = %pick.ticker,
                            strategy = %pick.strategy_name,
                            outcome = %resolution.outcome,
                            pct = resolution.pct,
                            "Pick resolved"
                        );
                        match resolution.outcome {
                            Outcome::Winner => summary.winners += 1,
                            Outcome::Loser => summary.losers += 1,
                            Outcome::Expired => summary.expired += 1,
                            Outcome::Pending => summary.still_pending += 1,
                        }
                    }
                    Ok(false) => {
                        debug!(pick_hash = %pick.pick_hash, "Pick already settled elsewhere");
                        summary.already_settled += 1;
                    }
                    Err(e) => {
                        warn!(pick_hash = %pick.pick_hash, error = %e, "Failed to record outcome");
                        summary.errors += 1;
                        summary.still_pending += 1;
                    }
                }
            }
        }

        if chunk_idx + 1 < chunk_count {
            tokio::time::sleep(config.chunk_pause()).await;
        }
    }

    info!(
        checked = summary.checked,
        winners = summary.winners,
        losers = summary.losers,
        expired = summary.expired,
        still_pending = summary.still_pending,
        already_settled = summary.already_settled,
        errors = summary.errors,
        "Resolve complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PickQuery, PickQueryResult, SqliteStore};
    use crate::testing::{bar, date, memory_store, pending_pick, StaticSource};
    use async_trait::async_trait;

    /// Hands out a pending list read before another run settled those picks
    struct StalePending {
        inner: SqliteStore,
        stale: Vec<Pick>,
    }

    #[async_trait]
    impl PickStore for StalePending {
        async fn insert_pick(&self, pick: &Pick) -> EngineResult<bool> {
            self.inner.insert_pick(pick).await
        }

        async fn pending_picks_since(&self, _since: NaiveDate) -> EngineResult<Vec<Pick>> {
            Ok(self.stale.clone())
        }

        async fn resolved_picks(&self) -> EngineResult<Vec<Pick>> {
            self.inner.resolved_picks().await
        }

        async fn record_outcome(
            &self,
            pick_hash: &str,
            outcome: Outcome,
            price: f64,
            pct: f64,
            date: NaiveDate,
        ) -> EngineResult<bool> {
            self.inner.record_outcome(pick_hash, outcome, price, pct, date).await
        }

        async fn query_picks(&self, query: &PickQuery) -> EngineResult<PickQueryResult> {
            self.inner.query_picks(query).await
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            chunk_pause_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_stop_checked_before_target_on_same_bar() {
        let scan = date(2026, 3, 2);
        let pick = pending_pick("AAPL", 100.0, 5.0, 2.0, scan);
        let bars = vec![bar(date(2026, 3, 3), 100.0, 106.0, 97.0, 101.0)];

        let r = evaluate(&pick, &bars, date(2026, 3, 3), 10).unwrap();
        assert_eq!(r.outcome, Outcome::Loser);
        assert_eq!(r.price, 98.0);
        assert_eq!(r.pct, -2.0);
        assert_eq!(r.date, date(2026, 3, 3));
    }

    #[test]
    fn test_target_hit() {
        let scan = date(2026, 3, 2);
        let pick = pending_pick("AAPL", 100.0, 5.0, 2.0, scan);
        let bars = vec![
            bar(date(2026, 3, 3), 100.0, 102.0, 99.0, 101.0),
            bar(date(2026, 3, 4), 101.0, 105.5, 100.5, 105.0),
        ];

        let r = evaluate(&pick, &bars, date(2026, 3, 4), 10).unwrap();
        assert_eq!(r.outcome, Outcome::Winner);
        assert_eq!(r.price, 105.0);
        assert_eq!(r.pct, 5.0);
        assert_eq!(r.date, date(2026, 3, 4));
    }

    #[test]
    fn test_scan_day_bar_is_ignored() {
        let scan = date(2026, 3, 2);
        let pick = pending_pick("AAPL", 100.0, 5.0, 2.0, scan);
        let bars = vec![
            bar(scan, 100.0, 110.0, 90.0, 100.0),
            bar(date(2026, 3, 3), 100.0, 101.0, 99.0, 100.0),
        ];
        assert!(evaluate(&pick, &bars, date(2026, 3, 3), 10).is_none());
    }

    #[test]
    fn test_expires_at_latest_close_after_max_hold() {
        let scan = date(2026, 3, 2);
        let pick = pending_pick("XYZ", 50.0, 10.0, 5.0, scan);
        let bars: Vec<Bar> = (1..=5)
            .map(|d| bar(date(2026, 3, 2 + d), 50.0, 51.0, 49.0, 50.0 + d as f64 * 0.2))
            .collect();

        // day 4: still inside the window
        assert!(evaluate(&pick, &bars[..4], date(2026, 3, 6), 5).is_none());

        let r = evaluate(&pick, &bars, date(2026, 3, 7), 5).unwrap();
        assert_eq!(r.outcome, Outcome::Expired);
        assert_eq!(r.price, 51.0);
        assert_eq!(r.pct, 2.0);
        assert_eq!(r.date, date(2026, 3, 7));
    }

    #[test]
    fn test_hits_after_horizon_do_not_count() {
        let scan = date(2026, 3, 2);
        let pick = pending_pick("XYZ", 50.0, 10.0, 5.0, scan);
        let bars = vec![
            bar(date(2026, 3, 3), 50.0, 51.0, 49.0, 50.5),
            bar(date(2026, 3, 20), 50.0, 60.0, 49.0, 59.0),
        ];
        let r = evaluate(&pick, &bars, date(2026, 3, 20), 5).unwrap();
        assert_eq!(r.outcome, Outcome::Expired);
        assert_eq!(r.price, 50.5);
    }

    #[tokio::test]
    async fn test_resolve_pending_end_to_end() {
        let store = memory_store().await;
        let scan = date(2026, 3, 2);
        let today = date(2026, 3, 4);

        store.insert_pick(&pending_pick("WIN", 100.0, 5.0, 2.0, scan)).await.unwrap();
        store.insert_pick(&pending_pick("LOSE", 100.0, 5.0, 2.0, scan)).await.unwrap();
        store.insert_pick(&pending_pick("FLAT", 100.0, 5.0, 2.0, scan)).await.unwrap();
        store.insert_pick(&pending_pick("GONE", 100.0, 5.0, 2.0, scan)).await.unwrap();
        store.insert_pick(&pending_pick("ERR", 100.0, 5.0, 2.0, scan)).await.unwrap();
        // outside the lookback window, never looked at
        store
            .insert_pick(&pending_pick("OLD", 100.0, 5.0, 2.0, date(2025, 12, 1)))
            .await
            .unwrap();

        let source = StaticSource::default()
            .with("WIN", vec![bar(date(2026, 3, 3), 100.0, 106.0, 99.0, 105.0)])
            .with("LOSE", vec![bar(date(2026, 3, 3), 100.0, 101.0, 97.0, 98.0)])
            .with("FLAT", vec![bar(date(2026, 3, 3), 100.0, 101.0, 99.0, 100.0)])
            .failing("ERR");

        let summary = resolve_pending(&store, &source, &ResolveRequest::default(), &config(), today)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ResolveSummary {
                checked: 5,
                winners: 1,
                losers: 1,
                expired: 0,
                still_pending: 3,
                already_settled: 0,
                errors: 2,
            }
        );
        assert_eq!(source.request_count(), 5);

        let winners = store
            .query_picks(&PickQuery {
                outcome: Some(Outcome::Winner),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(winners.picks.len(), 1);
        assert_eq!(winners.picks[0].ticker, "WIN");
        assert_eq!(winners.picks[0].outcome_price, Some(105.0));
    }

    #[tokio::test]
    async fn test_resolved_picks_are_not_revisited() {
        let store = memory_store().await;
        let scan = date(2026, 3, 2);
        store.insert_pick(&pending_pick("WIN", 100.0, 5.0, 2.0, scan)).await.unwrap();
        let source = StaticSource::default()
            .with("WIN", vec![bar(date(2026, 3, 3), 100.0, 106.0, 99.0, 105.0)]);

        let first = resolve_pending(&store, &source, &ResolveRequest::default(), &config(), date(2026, 3, 4))
            .await
            .unwrap();
        let second = resolve_pending(&store, &source, &ResolveRequest::default(), &config(), date(2026, 3, 5))
            .await
            .unwrap();

        assert_eq!(first.winners, 1);
        assert_eq!(second, ResolveSummary::default());
    }

    #[tokio::test]
    async fn test_invalid_request_has_no_side_effects() {
        let store = memory_store().await;
        let source = StaticSource::default();
        let request = ResolveRequest {
            lookback_days: 30,
            max_hold_days: 0,
        };
        let err = resolve_pending(&store, &source, &request, &config(), date(2026, 3, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_pick_settled_elsewhere_is_counted() {
        let store = memory_store().await;
        let pick = pending_pick("WIN", 100.0, 5.0, 2.0, date(2026, 3, 2));
        store.insert_pick(&pick).await.unwrap();
        let source = StaticSource::default()
            .with("WIN", vec![bar(date(2026, 3, 3), 100.0, 106.0, 99.0, 105.0)]);

        let first = resolve_pending(&store, &source, &ResolveRequest::default(), &config(), date(2026, 3, 4))
            .await
            .unwrap();
        assert_eq!(first.winners, 1);

        let stale = StalePending {
            inner: store.clone(),
            stale: vec![pick],
        };
        let second = resolve_pending(&stale, &source, &ResolveRequest::default(), &config(), date(2026, 3, 4))
            .await
            .unwrap();

        assert_eq!(
            second,
            ResolveSummary {
                checked: 1,
                already_settled: 1,
                ..Default::default()
            }
        );
        assert_eq!(store.resolved_picks().await.unwrap().len(), 1);
    }
}
