//! Watchlist repository: the ticker universe the scanner walks

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistRecord {
    pub id: Option<i64>,
    pub ticker: String,
    pub name: Option<String>,
    pub sector: String,
    pub is_cdr: bool,
    pub active: bool,
}

pub struct WatchlistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WatchlistRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update a ticker (upsert by ticker)
    pub async fn upsert(&self, record: &WatchlistRecord) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO watchlist (ticker, name, sector, is_cdr, active)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(ticker) DO UPDATE SET
                 name = excluded.name,
                 sector = excluded.sector,
                 is_cdr = excluded.is_cdr,
                 active = excluded.active
            "#,
        )
        .bind(record.ticker.to_uppercase())
        .bind(&record.name)
        .bind(&record.sector)
        .bind(record.is_cdr)
        .bind(record.active)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Mark a ticker inactive. Returns false if it was not on the list.
    pub async fn deactivate(&self, ticker: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE watchlist SET active = 0 WHERE ticker = ?1")
            .bind(ticker.to_uppercase())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_active(&self) -> DbResult<Vec<WatchlistRecord>> {
        let records = sqlx::query_as::<_, WatchlistRecord>(
            r#"SELECT id, ticker, name, sector, is_cdr, active
               FROM watchlist
               WHERE active = 1
               ORDER BY ticker ASC"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn get_by_ticker(&self, ticker: &str) -> DbResult<Option<WatchlistRecord>> {
        let record = sqlx::query_as::<_, WatchlistRecord>(
            "SELECT id, ticker, name, sector, is_cdr, active FROM watchlist WHERE ticker = ?1",
        )
        .bind(ticker.to_uppercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }
}
