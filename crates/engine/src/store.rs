//! Storage seams for the engine and their SQLite implementation
//!
//! The scanner, resolver, learner and pipeline only see these traits, so
//! tests can run them against an in-memory database.

use async_trait::async_trait;
use chrono::NaiveDate;
use persistence::repository::{
    AdjustmentRecord, DashboardStatsRecord, PickFilter, PickRecord, PickRepository, PickSort,
    PickSummary, RunRepository, RunSnapshotRecord, StrategyRecord, StrategyRepository,
    WatchlistRecord, WatchlistRepository,
};
use persistence::SqlitePool;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

use crate::catalog::Strategy;
use crate::error::{EngineError, EngineResult};
use crate::learner::StrategyAdjustment;
use crate::pipeline::PipelineSummary;
use crate::types::{Confidence, Outcome, Pick, TickerMeta};

pub type DashboardStats = DashboardStatsRecord;

const DEFAULT_QUERY_LIMIT: i64 = 200;

/// Filters for listing stored picks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickQuery {
    pub date: Option<NaiveDate>,
    pub strategy: Option<String>,
    pub ticker: Option<String>,
    pub outcome: Option<Outcome>,
    pub confidence: Option<Confidence>,
    pub is_cdr: Option<bool>,
    #[serde(default)]
    pub sort: PickSort,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickQueryResult {
    pub picks: Vec<Pick>,
    pub summary: PickSummary,
}

#[async_trait]
pub trait PickStore: Send + Sync {
    /// Returns false when a pick with the same hash already exists
    async fn insert_pick(&self, pick: &Pick) -> EngineResult<bool>;
    async fn pending_picks_since(&self, since: NaiveDate) -> EngineResult<Vec<Pick>>;
    async fn resolved_picks(&self) -> EngineResult<Vec<Pick>>;
    /// Returns false when the pick was no longer pending
    async fn record_outcome(
        &self,
        pick_hash: &str,
        outcome: Outcome,
        price: f64,
        pct: f64,
        date: NaiveDate,
    ) -> EngineResult<bool>;
    async fn query_picks(&self, query: &PickQuery) -> EngineResult<PickQueryResult>;
}

#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn strategies(&self) -> EngineResult<Vec<Strategy>>;
    async fn seed_strategy(&self, strategy: &Strategy) -> EngineResult<bool>;
    async fn set_enabled(&self, name: &str, enabled: bool) -> EngineResult<()>;
    /// Persist `updated`'s tuned fields and the adjustments that produced
    /// them atomically
    async fn apply_adjustments(
        &self,
        updated: &Strategy,
        adjustments: &[StrategyAdjustment],
    ) -> EngineResult<()>;
    async fn latest_adjustment(&self, strategy_name: &str) -> EngineResult<Option<StrategyAdjustment>>;
    async fn adjustments(&self, limit: i64) -> EngineResult<Vec<StrategyAdjustment>>;
}

#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn active_watchlist(&self) -> EngineResult<Vec<TickerMeta>>;
    async fn upsert_ticker(&self, meta: &TickerMeta) -> EngineResult<()>;
    async fn deactivate_ticker(&self, ticker: &str) -> EngineResult<bool>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn audit(&self, action: &str, detail: &str) -> EngineResult<()>;
    async fn save_run_snapshot(&self, summary: &PipelineSummary) -> EngineResult<()>;
    async fn refresh_dashboard_stats(&self) -> EngineResult<DashboardStats>;
}

/// Everything the daily pipeline needs
pub trait Store: PickStore + StrategyStore + WatchlistStore + AuditSink {}

impl<T: PickStore + StrategyStore + WatchlistStore + AuditSink> Store for T {}

// ============================================================================
// SQLite implementation
// ============================================================================

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_date(raw: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| EngineError::Corrupt(format!("date '{raw}': {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn pick_to_record(pick: &Pick) -> PickRecord {
    PickRecord {
        id: None,
        pick_hash: pick.pick_hash.clone(),
        ticker: pick.ticker.clone(),
        strategy_name: pick.strategy_name.clone(),
        scan_date: format_date(pick.scan_date),
        entry_price: pick.entry_price,
        stop_loss_price: pick.stop_loss_price,
        take_profit_price: pick.take_profit_price,
        stop_loss_pct: pick.stop_loss_pct,
        take_profit_pct: pick.take_profit_pct,
        score: i64::from(pick.score),
        confidence: pick.confidence.to_string(),
        is_cdr: pick.is_cdr,
        fee_roundtrip: pick.fee_roundtrip.to_string(),
        net_profit_if_target: pick.net_profit_if_target.to_string(),
        risk_reward_ratio: pick.risk_reward_ratio,
        signal_snapshot: serde_json::to_string(&pick.signal_snapshot).unwrap_or_else(|_| "{}".to_string()),
        outcome: pick.outcome.to_string(),
        outcome_price: pick.outcome_price,
        outcome_pct: pick.outcome_pct,
        outcome_date: pick.outcome_date.map(format_date),
    }
}

fn record_to_pick(record: PickRecord) -> EngineResult<Pick> {
    let snapshot: BTreeMap<String, f64> = serde_json::from_str(&record.signal_snapshot)
        .map_err(|e| EngineError::Corrupt(format!("snapshot of {}: {e}", record.pick_hash)))?;

    Ok(Pick {
        scan_date: parse_date(&record.scan_date)?,
        outcome_date: record.outcome_date.as_deref().map(parse_date).transpose()?,
        score: u8::try_from(record.score.clamp(0, 100)).unwrap_or(0),
        confidence: Confidence::from_str(&record.confidence).map_err(EngineError::Corrupt)?,
        outcome: Outcome::from_str(&record.outcome).map_err(EngineError::Corrupt)?,
        fee_roundtrip: Decimal::from_str(&record.fee_roundtrip).unwrap_or_default(),
        net_profit_if_target: Decimal::from_str(&record.net_profit_if_target).unwrap_or_default(),
        signal_snapshot: snapshot,
        pick_hash: record.pick_hash,
        ticker: record.ticker,
        strategy_name: record.strategy_name,
        entry_price: record.entry_price,
        stop_loss_price: record.stop_loss_price,
        take_profit_price: record.take_profit_price,
        stop_loss_pct: record.stop_loss_pct,
        take_profit_pct: record.take_profit_pct,
        is_cdr: record.is_cdr,
        risk_reward_ratio: record.risk_reward_ratio,
        outcome_price: record.outcome_price,
        outcome_pct: record.outcome_pct,
    })
}

/// Rows that fail to decode are logged and left out
fn records_to_picks(records: Vec<PickRecord>) -> Vec<Pick> {
    records
        .into_iter()
        .filter_map(|record| {
            let hash = record.pick_hash.clone();
            match record_to_pick(record) {
                Ok(pick) => Some(pick),
                Err(e) => {
                    warn!(pick_hash = %hash, error = %e, "Skipping undecodable pick row");
                    None
                }
            }
        })
        .collect()
}

fn record_to_strategy(record: StrategyRecord) -> EngineResult<Strategy> {
    Ok(Strategy {
        detector: record.detector_key.parse().map_err(EngineError::Corrupt)?,
        ideal_hold_days: u32::try_from(record.ideal_hold_days).unwrap_or(0),
        name: record.name,
        family: record.family,
        default_target_pct: record.default_target_pct,
        default_stop_pct: record.default_stop_pct,
        target_pct: record.target_pct,
        stop_pct: record.stop_pct,
        enabled: record.enabled,
        advisory: record.advisory,
    })
}

fn adjustment_to_record(adjustment: &StrategyAdjustment) -> AdjustmentRecord {
    AdjustmentRecord {
        id: None,
        strategy_name: adjustment.strategy_name.clone(),
        field: adjustment.field.clone(),
        old_value: adjustment.old_value,
        new_value: adjustment.new_value,
        sample_count: adjustment.sample_count as i64,
        reason_code: adjustment.reason_code.as_str().to_string(),
        reason: adjustment.reason.clone(),
        created_at: None,
    }
}

fn record_to_adjustment(record: AdjustmentRecord) -> EngineResult<StrategyAdjustment> {
    Ok(StrategyAdjustment {
        reason_code: record.reason_code.parse().map_err(EngineError::Corrupt)?,
        strategy_name: record.strategy_name,
        field: record.field,
        old_value: record.old_value,
        new_value: record.new_value,
        sample_count: usize::try_from(record.sample_count).unwrap_or(0),
        reason: record.reason,
    })
}

fn strategy_to_record(strategy: &Strategy) -> StrategyRecord {
    StrategyRecord {
        id: None,
        name: strategy.name.clone(),
        family: strategy.family.clone(),
        detector_key: strategy.detector.key().to_string(),
        ideal_hold_days: i64::from(strategy.ideal_hold_days),
        default_target_pct: strategy.default_target_pct,
        default_stop_pct: strategy.default_stop_pct,
        target_pct: strategy.target_pct,
        stop_pct: strategy.stop_pct,
        enabled: strategy.enabled,
        advisory: strategy.advisory.clone(),
    }
}

#[async_trait]
impl PickStore for SqliteStore {
    async fn insert_pick(&self, pick: &Pick) -> EngineResult<bool> {
        let repo = PickRepository::new(&self.pool);
        Ok(repo.insert_if_absent(&pick_to_record(pick)).await?)
    }

    async fn pending_picks_since(&self, since: NaiveDate) -> EngineResult<Vec<Pick>> {
        let repo = PickRepository::new(&self.pool);
        Ok(records_to_picks(repo.get_pending_since(&format_date(since)).await?))
    }

    async fn resolved_picks(&self) -> EngineResult<Vec<Pick>> {
        let repo = PickRepository::new(&self.pool);
        Ok(records_to_picks(repo.get_resolved().await?))
    }

    async fn record_outcome(
        &self,
        pick_hash: &str,
        outcome: Outcome,
        price: f64,
        pct: f64,
        date: NaiveDate,
    ) -> EngineResult<bool> {
        if !outcome.is_terminal() {
            return Err(EngineError::InvalidInput(
                "outcome must be winner, loser or expired".to_string(),
            ));
        }
        let repo = PickRepository::new(&self.pool);
        Ok(repo
            .record_outcome(pick_hash, outcome.as_str(), price, pct, &format_date(date))
            .await?)
    }

    async fn query_picks(&self, query: &PickQuery) -> EngineResult<PickQueryResult> {
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        if limit <= 0 {
            return Err(EngineError::InvalidInput(format!("limit must be positive, got {limit}")));
        }

        let filter = PickFilter {
            scan_date: query.date.map(format_date),
            strategy_name: query.strategy.clone(),
            ticker: query.ticker.clone(),
            outcome: query.outcome.map(|o| o.to_string()),
            confidence: query.confidence.map(|c| c.to_string()),
            is_cdr: query.is_cdr,
        };

        let repo = PickRepository::new(&self.pool);
        let (records, summary) = repo.query(&filter, query.sort, limit).await?;

        Ok(PickQueryResult {
            picks: records_to_picks(records),
            summary,
        })
    }
}

#[async_trait]
impl StrategyStore for SqliteStore {
    async fn strategies(&self) -> EngineResult<Vec<Strategy>> {
        let repo = StrategyRepository::new(&self.pool);
        repo.get_all()
            .await?
            .into_iter()
            .map(record_to_strategy)
            .collect()
    }

    async fn seed_strategy(&self, strategy: &Strategy) -> EngineResult<bool> {
        let repo = StrategyRepository::new(&self.pool);
        Ok(repo.seed(&strategy_to_record(strategy)).await?)
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> EngineResult<()> {
        let repo = StrategyRepository::new(&self.pool);
        Ok(repo.set_enabled(name, enabled).await?)
    }

    async fn apply_adjustments(
        &self,
        updated: &Strategy,
        adjustments: &[StrategyAdjustment],
    ) -> EngineResult<()> {
        let repo = StrategyRepository::new(&self.pool);
        let records: Vec<AdjustmentRecord> = adjustments.iter().map(adjustment_to_record).collect();
        Ok(repo
            .apply_adjustments(&strategy_to_record(updated), &records)
            .await?)
    }

    async fn latest_adjustment(&self, strategy_name: &str) -> EngineResult<Option<StrategyAdjustment>> {
        let repo = StrategyRepository::new(&self.pool);
        repo.latest_adjustment(strategy_name)
            .await?
            .map(record_to_adjustment)
            .transpose()
    }

    async fn adjustments(&self, limit: i64) -> EngineResult<Vec<StrategyAdjustment>> {
        let repo = StrategyRepository::new(&self.pool);
        repo.get_adjustments(limit)
            .await?
            .into_iter()
            .map(record_to_adjustment)
            .collect()
    }
}

#[async_trait]
impl WatchlistStore for SqliteStore {
    async fn active_watchlist(&self) -> EngineResult<Vec<TickerMeta>> {
        let repo = WatchlistRepository::new(&self.pool);
        Ok(repo
            .get_active()
            .await?
            .into_iter()
            .map(|r| TickerMeta {
                ticker: r.ticker,
                name: r.name,
                sector: r.sector,
                is_cdr: r.is_cdr,
            })
            .collect())
    }

    async fn upsert_ticker(&self, meta: &TickerMeta) -> EngineResult<()> {
        if meta.ticker.trim().is_empty() {
            return Err(EngineError::InvalidInput("ticker must not be empty".to_string()));
        }
        let repo = WatchlistRepository::new(&self.pool);
        repo.upsert(&WatchlistRecord {
            id: None,
            ticker: meta.ticker.trim().to_uppercase(),
            name: meta.name.clone(),
            sector: meta.sector.clone(),
            is_cdr: meta.is_cdr,
            active: true,
        })
        .await?;
        Ok(())
    }

    async fn deactivate_ticker(&self, ticker: &str) -> EngineResult<bool> {
        let repo = WatchlistRepository::new(&self.pool);
        Ok(repo.deactivate(ticker).await?)
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn audit(&self, action: &str, detail: &str) -> EngineResult<()> {
        let repo = RunRepository::new(&self.pool);
        repo.append_audit(action, detail).await?;
        Ok(())
    }

    async fn save_run_snapshot(&self, summary: &PipelineSummary) -> EngineResult<()> {
        let repo = RunRepository::new(&self.pool);
        let steps_json = serde_json::to_string(&summary.steps)
            .map_err(|e| EngineError::InvalidInput(format!("run steps: {e}")))?;
        repo.save_snapshot(&RunSnapshotRecord {
            id: None,
            run_id: summary.run_id.clone(),
            started_at: summary.started_at.to_rfc3339(),
            elapsed_ms: summary.elapsed_ms as i64,
            steps_json,
        })
        .await?;
        Ok(())
    }

    async fn refresh_dashboard_stats(&self) -> EngineResult<DashboardStats> {
        let repo = RunRepository::new(&self.pool);
        Ok(repo.refresh_dashboard_stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::types::compute_pick_hash;
    use persistence::Database;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn pick(ticker: &str, strategy: &str, date: NaiveDate, score: u8) -> Pick {
        let mut snapshot = BTreeMap::new();
        snapshot.insert("rsi_14".to_string(), 31.5);
        Pick {
            pick_hash: compute_pick_hash(ticker, date, strategy),
            ticker: ticker.to_string(),
            strategy_name: strategy.to_string(),
            scan_date: date,
            entry_price: 100.0,
            stop_loss_price: 98.0,
            take_profit_price: 105.0,
            stop_loss_pct: 2.0,
            take_profit_pct: 5.0,
            score,
            confidence: Confidence::from_score(score),
            is_cdr: false,
            fee_roundtrip: dec!(30.85),
            net_profit_if_target: dec!(19.15),
            risk_reward_ratio: 2.5,
            signal_snapshot: snapshot,
            outcome: Outcome::Pending,
            outcome_price: None,
            outcome_pct: None,
            outcome_date: None,
        }
    }

    async fn store() -> SqliteStore {
        let db = Database::in_memory().await.unwrap();
        SqliteStore::new(db.pool_clone())
    }

    #[tokio::test]
    async fn test_pick_roundtrip_preserves_decimals_and_snapshot() {
        let store = store().await;
        let original = pick("AAPL", "Gap Up Momentum", day(2), 80);
        assert!(store.insert_pick(&original).await.unwrap());
        assert!(!store.insert_pick(&original).await.unwrap());

        let pending = store.pending_picks_since(day(1)).await.unwrap();
        assert_eq!(pending, vec![original]);
    }

    #[tokio::test]
    async fn test_outcome_transition_happens_once() {
        let store = store().await;
        let p = pick("AAPL", "Gap Up Momentum", day(2), 80);
        store.insert_pick(&p).await.unwrap();

        assert!(store
            .record_outcome(&p.pick_hash, Outcome::Winner, 105.0, 5.0, day(4))
            .await
            .unwrap());
        assert!(!store
            .record_outcome(&p.pick_hash, Outcome::Loser, 98.0, -2.0, day(5))
            .await
            .unwrap());

        let resolved = store.resolved_picks().await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].outcome, Outcome::Winner);
        assert_eq!(resolved[0].outcome_date, Some(day(4)));
        assert!(store.pending_picks_since(day(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_outcome_rejects_pending() {
        let store = store().await;
        let err = store
            .record_outcome("abc", Outcome::Pending, 1.0, 0.0, day(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_query_filters_by_typed_fields() {
        let store = store().await;
        store.insert_pick(&pick("AAPL", "A", day(2), 80)).await.unwrap();
        store.insert_pick(&pick("MSFT", "A", day(2), 60)).await.unwrap();
        store.insert_pick(&pick("MSFT", "A", day(3), 40)).await.unwrap();

        let result = store
            .query_picks(&PickQuery {
                date: Some(day(2)),
                confidence: Some(Confidence::High),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.picks.len(), 1);
        assert_eq!(result.picks[0].ticker, "AAPL");
        assert_eq!(result.summary.total, 1);

        let bad = store
            .query_picks(&PickQuery {
                limit: Some(0),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_strategy_seed_and_load() {
        let store = store().await;
        for s in default_catalog() {
            assert!(store.seed_strategy(&s).await.unwrap());
        }
        let loaded = store.strategies().await.unwrap();
        assert_eq!(loaded, default_catalog());
    }

    #[tokio::test]
    async fn test_watchlist_upsert_and_deactivate() {
        let store = store().await;
        store
            .upsert_ticker(&TickerMeta::new("shop.to", "Technology", false))
            .await
            .unwrap();
        store
            .upsert_ticker(&TickerMeta::new("AAPL", "Technology", true))
            .await
            .unwrap();
        assert!(store.deactivate_ticker("SHOP.TO").await.unwrap());

        let active = store.active_watchlist().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].ticker, "AAPL");
        assert!(active[0].is_cdr);

        let empty = store.upsert_ticker(&TickerMeta::new("  ", "", false)).await;
        assert!(matches!(empty, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_undecodable_row_is_skipped() {
        let store = store().await;
        let good = pick("AAPL", "A", day(2), 80);
        let bad = pick("MSFT", "A", day(2), 70);
        store.insert_pick(&good).await.unwrap();
        store.insert_pick(&bad).await.unwrap();

        sqlx::query("UPDATE picks SET signal_snapshot = 'not json' WHERE pick_hash = ?")
            .bind(&bad.pick_hash)
            .execute(store.pool())
            .await
            .unwrap();

        let pending = store.pending_picks_since(day(1)).await.unwrap();
        assert_eq!(pending, vec![good.clone()]);

        let listed = store.query_picks(&PickQuery::default()).await.unwrap();
        assert_eq!(listed.picks.len(), 1);

        store
            .record_outcome(&bad.pick_hash, Outcome::Loser, 98.0, -2.0, day(4))
            .await
            .unwrap();
        assert!(store.resolved_picks().await.unwrap().is_empty());
    }
}
