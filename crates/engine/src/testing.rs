//! Shared test fixtures

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::api::PriceSource;
use crate::store::SqliteStore;
use crate::types::{compute_pick_hash, Bar, Confidence, Outcome, Pick};

/// Price source backed by a fixed map; tickers listed in `failing` return an error
#[derive(Default)]
pub struct StaticSource {
    pub bars: HashMap<String, Vec<Bar>>,
    pub failing: Vec<String>,
    pub requests: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn with(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }

    pub fn failing(mut self, ticker: &str) -> Self {
        self.failing.push(ticker.to_string());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PriceSource for StaticSource {
    async fn daily_bars(&self, ticker: &str) -> anyhow::Result<Option<Vec<Bar>>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(ticker.to_string());
        }
        if self.failing.iter().any(|t| t == ticker) {
            anyhow::bail!("connection reset");
        }
        Ok(self.bars.get(ticker).cloned())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bars on consecutive days starting at `start`, open = close, ±0.5% range
pub fn make_bars(start: NaiveDate, closes: &[f64], volume: f64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            date: start + chrono::Days::new(i as u64),
            open: c,
            high: c * 1.005,
            low: c * 0.995,
            close: c,
            volume,
        })
        .collect()
}

pub fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        date,
        open,
        high,
        low,
        close,
        volume: 1_000_000.0,
    }
}

pub async fn memory_store() -> SqliteStore {
    let db = persistence::Database::in_memory().await.unwrap();
    SqliteStore::new(db.pool_clone())
}

/// A pending pick with prices derived from `entry` and the two percentages
pub fn pending_pick(ticker: &str, entry: f64, tp_pct: f64, sl_pct: f64, scan: NaiveDate) -> Pick {
    Pick {
        pick_hash: compute_pick_hash(ticker, scan, "Test Strategy"),
        ticker: ticker.to_string(),
        strategy_name: "Test Strategy".to_string(),
        scan_date: scan,
        entry_price: entry,
        stop_loss_price: entry * (1.0 - sl_pct / 100.0),
        take_profit_price: entry * (1.0 + tp_pct / 100.0),
        stop_loss_pct: sl_pct,
        take_profit_pct: tp_pct,
        score: 60,
        confidence: Confidence::Medium,
        is_cdr: false,
        fee_roundtrip: Decimal::ZERO,
        net_profit_if_target: Decimal::ZERO,
        risk_reward_ratio: tp_pct / sl_pct,
        signal_snapshot: BTreeMap::new(),
        outcome: Outcome::Pending,
        outcome_price: None,
        outcome_pct: None,
        outcome_date: None,
    }
}
