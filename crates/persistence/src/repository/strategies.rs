//! Strategy configuration and learner adjustment history

use crate::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A persisted strategy configuration row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StrategyRecord {
    pub id: Option<i64>,
    pub name: String,
    pub family: String,
    pub detector_key: String,
    pub ideal_hold_days: i64,
    pub default_target_pct: f64,
    pub default_stop_pct: f64,
    pub target_pct: f64,
    pub stop_pct: f64,
    pub enabled: bool,
    pub advisory: Option<String>,
}

/// One learner action (parameter change, disable, or advisory note)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdjustmentRecord {
    pub id: Option<i64>,
    pub strategy_name: String,
    pub field: String,
    pub old_value: Option<f64>,
    pub new_value: Option<f64>,
    pub sample_count: i64,
    pub reason_code: String,
    pub reason: String,
    pub created_at: Option<i64>,
}

/// Repository for strategies and their adjustment trail
pub struct StrategyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StrategyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a strategy if its name is not yet known. Existing rows keep
    /// whatever the learner has tuned them to.
    pub async fn seed(&self, record: &StrategyRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO strategies (
                name, family, detector_key, ideal_hold_days,
                default_target_pct, default_stop_pct, target_pct, stop_pct, enabled
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(&record.family)
        .bind(&record.detector_key)
        .bind(record.ideal_hold_days)
        .bind(record.default_target_pct)
        .bind(record.default_stop_pct)
        .bind(record.target_pct)
        .bind(record.stop_pct)
        .bind(record.enabled)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_all(&self) -> DbResult<Vec<StrategyRecord>> {
        let records = sqlx::query_as::<_, StrategyRecord>(
            r#"
            SELECT id, name, family, detector_key, ideal_hold_days,
                   default_target_pct, default_stop_pct, target_pct, stop_pct,
                   enabled, advisory
            FROM strategies
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<StrategyRecord>> {
        let record = sqlx::query_as::<_, StrategyRecord>(
            r#"
            SELECT id, name, family, detector_key, ideal_hold_days,
                   default_target_pct, default_stop_pct, target_pct, stop_pct,
                   enabled, advisory
            FROM strategies
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> DbResult<()> {
        sqlx::query(
            "UPDATE strategies SET enabled = ?, updated_at = strftime('%s', 'now') WHERE name = ?",
        )
        .bind(enabled)
        .bind(name)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Write a strategy's tuned fields and the adjustment rows explaining
    /// them in one transaction. Nothing is written for an unknown name.
    pub async fn apply_adjustments(
        &self,
        update: &StrategyRecord,
        adjustments: &[AdjustmentRecord],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE strategies
            SET target_pct = ?, stop_pct = ?, enabled = ?, advisory = ?,
                updated_at = strftime('%s', 'now')
            WHERE name = ?
            "#,
        )
        .bind(update.target_pct)
        .bind(update.stop_pct)
        .bind(update.enabled)
        .bind(&update.advisory)
        .bind(&update.name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Query(format!("unknown strategy '{}'", update.name)));
        }

        for record in adjustments {
            sqlx::query(
                r#"
                INSERT INTO strategy_adjustments (
                    strategy_name, field, old_value, new_value, sample_count, reason_code, reason
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.strategy_name)
            .bind(&record.field)
            .bind(record.old_value)
            .bind(record.new_value)
            .bind(record.sample_count)
            .bind(&record.reason_code)
            .bind(&record.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn latest_adjustment(&self, strategy_name: &str) -> DbResult<Option<AdjustmentRecord>> {
        let record = sqlx::query_as::<_, AdjustmentRecord>(
            r#"
            SELECT id, strategy_name, field, old_value, new_value,
                   sample_count, reason_code, reason, created_at
            FROM strategy_adjustments
            WHERE strategy_name = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(strategy_name)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Most recent adjustments first
    pub async fn get_adjustments(&self, limit: i64) -> DbResult<Vec<AdjustmentRecord>> {
        let records = sqlx::query_as::<_, AdjustmentRecord>(
            r#"
            SELECT id, strategy_name, field, old_value, new_value,
                   sample_count, reason_code, reason, created_at
            FROM strategy_adjustments
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }
}
