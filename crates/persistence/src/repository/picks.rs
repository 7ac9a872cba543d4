//! Picks repository: the append-only signal ledger

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A single persisted pick
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PickRecord {
    pub id: Option<i64>,
    pub pick_hash: String,
    pub ticker: String,
    pub strategy_name: String,
    pub scan_date: String,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub score: i64,
    pub confidence: String,
    pub is_cdr: bool,
    pub fee_roundtrip: String,
    pub net_profit_if_target: String,
    pub risk_reward_ratio: f64,
    pub signal_snapshot: String,
    pub outcome: String,
    pub outcome_price: Option<f64>,
    pub outcome_pct: Option<f64>,
    pub outcome_date: Option<String>,
}

/// Filters for the pick query interface. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickFilter {
    pub scan_date: Option<String>,
    pub strategy_name: Option<String>,
    pub ticker: Option<String>,
    pub outcome: Option<String>,
    pub confidence: Option<String>,
    pub is_cdr: Option<bool>,
}

/// Sort order for pick listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickSort {
    #[default]
    Score,
    RiskReward,
}

impl std::str::FromStr for PickSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(PickSort::Score),
            "risk_reward" | "rr" => Ok(PickSort::RiskReward),
            other => Err(format!("unknown sort '{other}', expected score or risk_reward")),
        }
    }
}

/// Summary counts over a filtered pick set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickSummary {
    pub total: i64,
    pub winners: i64,
    pub losers: i64,
    pub expired: i64,
    pub pending: i64,
    pub avg_score: f64,
}

const PICK_COLUMNS: &str = r#"
    id, pick_hash, ticker, strategy_name, scan_date,
    entry_price, stop_loss_price, take_profit_price, stop_loss_pct, take_profit_pct,
    score, confidence, is_cdr, fee_roundtrip, net_profit_if_target, risk_reward_ratio,
    signal_snapshot, outcome, outcome_price, outcome_pct, outcome_date
"#;

/// Repository for picks
pub struct PickRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PickRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a pick unless one with the same pick_hash exists.
    /// Returns true when a new row was written.
    pub async fn insert_if_absent(&self, record: &PickRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO picks (
                pick_hash, ticker, strategy_name, scan_date,
                entry_price, stop_loss_price, take_profit_price, stop_loss_pct, take_profit_pct,
                score, confidence, is_cdr, fee_roundtrip, net_profit_if_target,
                risk_reward_ratio, signal_snapshot, outcome
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(&record.pick_hash)
        .bind(&record.ticker)
        .bind(&record.strategy_name)
        .bind(&record.scan_date)
        .bind(record.entry_price)
        .bind(record.stop_loss_price)
        .bind(record.take_profit_price)
        .bind(record.stop_loss_pct)
        .bind(record.take_profit_pct)
        .bind(record.score)
        .bind(&record.confidence)
        .bind(record.is_cdr)
        .bind(&record.fee_roundtrip)
        .bind(&record.net_profit_if_target)
        .bind(record.risk_reward_ratio)
        .bind(&record.signal_snapshot)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a pick by its hash
    pub async fn get_by_hash(&self, hash: &str) -> DbResult<Option<PickRecord>> {
        let sql = format!("SELECT {PICK_COLUMNS} FROM picks WHERE pick_hash = ?");
        let record = sqlx::query_as::<_, PickRecord>(&sql)
            .bind(hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    /// Pending picks scanned on or after `since` (ISO date), grouped by ticker
    pub async fn get_pending_since(&self, since: &str) -> DbResult<Vec<PickRecord>> {
        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM picks
             WHERE outcome = 'pending' AND scan_date >= ?
             ORDER BY ticker ASC, scan_date ASC, id ASC"
        );
        let records = sqlx::query_as::<_, PickRecord>(&sql)
            .bind(since)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// All picks that reached a terminal outcome
    pub async fn get_resolved(&self) -> DbResult<Vec<PickRecord>> {
        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM picks
             WHERE outcome IN ('winner', 'loser', 'expired')
             ORDER BY scan_date ASC, id ASC"
        );
        let records = sqlx::query_as::<_, PickRecord>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// Record a terminal outcome. The `outcome = 'pending'` guard makes this a
    /// one-shot transition: returns false if the pick was already resolved.
    pub async fn record_outcome(
        &self,
        hash: &str,
        outcome: &str,
        outcome_price: f64,
        outcome_pct: f64,
        outcome_date: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE picks
            SET outcome = ?, outcome_price = ?, outcome_pct = ?, outcome_date = ?
            WHERE pick_hash = ? AND outcome = 'pending'
            "#,
        )
        .bind(outcome)
        .bind(outcome_price)
        .bind(outcome_pct)
        .bind(outcome_date)
        .bind(hash)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Filtered, sorted listing plus summary counts over the same filter
    pub async fn query(
        &self,
        filter: &PickFilter,
        sort: PickSort,
        limit: i64,
    ) -> DbResult<(Vec<PickRecord>, PickSummary)> {
        let mut where_clauses = vec!["1=1".to_string()];
        let mut binds: Vec<String> = Vec::new();

        if let Some(date) = &filter.scan_date {
            where_clauses.push("scan_date = ?".to_string());
            binds.push(date.clone());
        }
        if let Some(strategy) = &filter.strategy_name {
            where_clauses.push("strategy_name = ?".to_string());
            binds.push(strategy.clone());
        }
        if let Some(ticker) = &filter.ticker {
            where_clauses.push("ticker = ?".to_string());
            binds.push(ticker.to_uppercase());
        }
        if let Some(outcome) = &filter.outcome {
            where_clauses.push("outcome = ?".to_string());
            binds.push(outcome.clone());
        }
        if let Some(confidence) = &filter.confidence {
            where_clauses.push("confidence = ?".to_string());
            binds.push(confidence.clone());
        }
        if let Some(is_cdr) = filter.is_cdr {
            where_clauses.push("is_cdr = CAST(? AS INTEGER)".to_string());
            binds.push(if is_cdr { "1" } else { "0" }.to_string());
        }

        let where_sql = where_clauses.join(" AND ");

        let summary_sql = format!(
            r#"
            SELECT COUNT(*),
                   SUM(CASE WHEN outcome = 'winner' THEN 1 ELSE 0 END),
                   SUM(CASE WHEN outcome = 'loser' THEN 1 ELSE 0 END),
                   SUM(CASE WHEN outcome = 'expired' THEN 1 ELSE 0 END),
                   SUM(CASE WHEN outcome = 'pending' THEN 1 ELSE 0 END),
                   AVG(score)
            FROM picks
            WHERE {where_sql}
            "#
        );
        let mut summary_query = sqlx::query_as::<
            _,
            (i64, Option<i64>, Option<i64>, Option<i64>, Option<i64>, Option<f64>),
        >(&summary_sql);
        for b in &binds {
            summary_query = summary_query.bind(b);
        }
        let (total, winners, losers, expired, pending, avg_score) =
            summary_query.fetch_one(self.pool).await?;

        let order_sql = match sort {
            PickSort::Score => "score DESC, ticker ASC, strategy_name ASC",
            PickSort::RiskReward => "risk_reward_ratio DESC, score DESC, ticker ASC",
        };

        let data_sql = format!(
            "SELECT {PICK_COLUMNS} FROM picks WHERE {where_sql} ORDER BY {order_sql} LIMIT ?"
        );
        let mut data_query = sqlx::query_as::<_, PickRecord>(&data_sql);
        for b in &binds {
            data_query = data_query.bind(b);
        }
        data_query = data_query.bind(limit);
        let records = data_query.fetch_all(self.pool).await?;

        let summary = PickSummary {
            total,
            winners: winners.unwrap_or(0),
            losers: losers.unwrap_or(0),
            expired: expired.unwrap_or(0),
            pending: pending.unwrap_or(0),
            avg_score: avg_score.unwrap_or(0.0),
        };

        Ok((records, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn record(hash: &str, ticker: &str, score: i64, rr: f64) -> PickRecord {
        PickRecord {
            id: None,
            pick_hash: hash.to_string(),
            ticker: ticker.to_string(),
            strategy_name: "Gap-Up Momentum".to_string(),
            scan_date: "2026-03-02".to_string(),
            entry_price: 100.0,
            stop_loss_price: 98.0,
            take_profit_price: 105.0,
            stop_loss_pct: 2.0,
            take_profit_pct: 5.0,
            score,
            confidence: "medium".to_string(),
            is_cdr: false,
            fee_roundtrip: "3.51".to_string(),
            net_profit_if_target: "46.49".to_string(),
            risk_reward_ratio: rr,
            signal_snapshot: "{}".to_string(),
            outcome: "pending".to_string(),
            outcome_price: None,
            outcome_pct: None,
            outcome_date: None,
        }
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("score".parse::<PickSort>().unwrap(), PickSort::Score);
        assert_eq!("RR".parse::<PickSort>().unwrap(), PickSort::RiskReward);
        assert_eq!("risk_reward".parse::<PickSort>().unwrap(), PickSort::RiskReward);
        assert!("scroe".parse::<PickSort>().is_err());
        assert!("".parse::<PickSort>().is_err());
    }

    #[tokio::test]
    async fn test_insert_if_absent_dedupes_by_hash() {
        let db = Database::in_memory().await.unwrap();
        let repo = PickRepository::new(db.pool());

        assert!(repo.insert_if_absent(&record("h1", "AAPL", 60, 2.5)).await.unwrap());
        assert!(!repo.insert_if_absent(&record("h1", "AAPL", 90, 2.5)).await.unwrap());

        let stored = repo.get_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(stored.score, 60, "second insert must not overwrite");
        assert_eq!(stored.outcome, "pending");
    }

    #[tokio::test]
    async fn test_record_outcome_only_once() {
        let db = Database::in_memory().await.unwrap();
        let repo = PickRepository::new(db.pool());
        repo.insert_if_absent(&record("h1", "AAPL", 60, 2.5)).await.unwrap();

        assert!(repo
            .record_outcome("h1", "loser", 98.0, -2.0, "2026-03-03")
            .await
            .unwrap());
        assert!(!repo
            .record_outcome("h1", "winner", 105.0, 5.0, "2026-03-04")
            .await
            .unwrap());

        let stored = repo.get_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(stored.outcome, "loser");
        assert_eq!(stored.outcome_price, Some(98.0));
        assert!(repo.get_pending_since("2026-01-01").await.unwrap().is_empty());
        assert_eq!(repo.get_resolved().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_summarizes() {
        let db = Database::in_memory().await.unwrap();
        let repo = PickRepository::new(db.pool());
        repo.insert_if_absent(&record("a", "AAPL", 60, 3.0)).await.unwrap();
        repo.insert_if_absent(&record("b", "MSFT", 80, 1.5)).await.unwrap();
        let mut cdr = record("c", "SHOP.NE", 70, 2.0);
        cdr.is_cdr = true;
        repo.insert_if_absent(&cdr).await.unwrap();
        repo.record_outcome("a", "winner", 105.0, 5.0, "2026-03-03")
            .await
            .unwrap();

        let (picks, summary) = repo
            .query(&PickFilter::default(), PickSort::Score, 50)
            .await
            .unwrap();
        assert_eq!(
            picks.iter().map(|p| p.pick_hash.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.winners, 1);
        assert_eq!(summary.pending, 2);
        assert!((summary.avg_score - 70.0).abs() < 1e-9);

        let (by_rr, _) = repo
            .query(&PickFilter::default(), PickSort::RiskReward, 50)
            .await
            .unwrap();
        assert_eq!(by_rr[0].pick_hash, "a");

        let filter = PickFilter {
            is_cdr: Some(true),
            ..Default::default()
        };
        let (only_cdr, summary) = repo.query(&filter, PickSort::Score, 50).await.unwrap();
        assert_eq!(only_cdr.len(), 1);
        assert_eq!(only_cdr[0].ticker, "SHOP.NE");
        assert_eq!(summary.total, 1);

        let filter = PickFilter {
            ticker: Some("msft".to_string()),
            ..Default::default()
        };
        let (msft, _) = repo.query(&filter, PickSort::Score, 50).await.unwrap();
        assert_eq!(msft.len(), 1);
    }

    #[tokio::test]
    async fn test_query_on_empty_table() {
        let db = Database::in_memory().await.unwrap();
        let repo = PickRepository::new(db.pool());
        let (picks, summary) = repo
            .query(&PickFilter::default(), PickSort::Score, 10)
            .await
            .unwrap();
        assert!(picks.is_empty());
        assert_eq!(summary, PickSummary::default());
    }
}
