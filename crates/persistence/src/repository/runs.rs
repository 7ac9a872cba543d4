//! Audit log, run snapshots and the dashboard stats row

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditRecord {
    pub id: Option<i64>,
    pub action: String,
    pub detail: String,
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunSnapshotRecord {
    pub id: Option<i64>,
    pub run_id: String,
    pub started_at: String,
    pub elapsed_ms: i64,
    pub steps_json: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct DashboardStatsRecord {
    pub total_picks: i64,
    pub pending: i64,
    pub winners: i64,
    pub losers: i64,
    pub expired: i64,
    pub win_rate: f64,
    pub avg_score: f64,
    pub avg_outcome_pct: f64,
    pub refreshed_at: Option<i64>,
}

pub struct RunRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RunRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append_audit(&self, action: &str, detail: &str) -> DbResult<i64> {
        let result = sqlx::query("INSERT INTO audit_log (action, detail) VALUES (?1, ?2)")
            .bind(action)
            .bind(detail)
            .execute(self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn recent_audit(&self, limit: i64) -> DbResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            "SELECT id, action, detail, created_at FROM audit_log ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn save_snapshot(&self, record: &RunSnapshotRecord) -> DbResult<i64> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO run_snapshots (run_id, started_at, elapsed_ms, steps_json)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(&record.run_id)
        .bind(&record.started_at)
        .bind(record.elapsed_ms)
        .bind(&record.steps_json)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn latest_snapshot(&self) -> DbResult<Option<RunSnapshotRecord>> {
        let record = sqlx::query_as::<_, RunSnapshotRecord>(
            "SELECT id, run_id, started_at, elapsed_ms, steps_json FROM run_snapshots ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Recompute the single dashboard row from the picks ledger
    pub async fn refresh_dashboard_stats(&self) -> DbResult<DashboardStatsRecord> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO dashboard_stats (
                id, total_picks, pending, winners, losers, expired,
                win_rate, avg_score, avg_outcome_pct, refreshed_at
            )
            SELECT 1,
                   COUNT(*),
                   COALESCE(SUM(CASE WHEN outcome = 'pending' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN outcome = 'winner' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN outcome = 'loser' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN outcome = 'expired' THEN 1 ELSE 0 END), 0),
                   COALESCE(
                       100.0 * SUM(CASE WHEN outcome = 'winner' THEN 1 ELSE 0 END)
                       / NULLIF(SUM(CASE WHEN outcome != 'pending' THEN 1 ELSE 0 END), 0),
                       0),
                   COALESCE(AVG(score), 0),
                   COALESCE(AVG(outcome_pct), 0),
                   strftime('%s', 'now')
            FROM picks
            "#,
        )
        .execute(self.pool)
        .await?;

        self.dashboard_stats().await
    }

    pub async fn dashboard_stats(&self) -> DbResult<DashboardStatsRecord> {
        let record = sqlx::query_as::<_, DashboardStatsRecord>(
            r#"SELECT total_picks, pending, winners, losers, expired,
                      win_rate, avg_score, avg_outcome_pct, refreshed_at
               FROM dashboard_stats WHERE id = 1"#,
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(record.unwrap_or_default())
    }
}
