//! Runtime configuration, read from the environment with defaults

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::fees::FeeConfig;

/// Knobs for a scan/resolve/learn run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    /// Tickers fetched per batch
    pub chunk_size: usize,
    /// Pause between batches, in milliseconds
    pub chunk_pause_ms: u64,
    /// Upper bound on a single price fetch
    pub fetch_timeout_secs: u64,
    pub max_hold_days: i64,
    pub lookback_days: i64,
    /// Yahoo chart range, e.g. "3mo"
    pub history_range: String,
    pub fees: FeeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/picks.db"),
            chunk_size: 10,
            chunk_pause_ms: 500,
            fetch_timeout_secs: 15,
            max_hold_days: 10,
            lookback_days: 30,
            history_range: "3mo".to_string(),
            fees: FeeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SWING_PICKS_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            db_path: lookup("SWING_PICKS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            chunk_size: parse_or(&lookup, "SWING_PICKS_CHUNK_SIZE", defaults.chunk_size).max(1),
            chunk_pause_ms: parse_or(&lookup, "SWING_PICKS_CHUNK_PAUSE_MS", defaults.chunk_pause_ms),
            fetch_timeout_secs: parse_or(
                &lookup,
                "SWING_PICKS_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            )
            .max(1),
            max_hold_days: parse_or(&lookup, "SWING_PICKS_MAX_HOLD_DAYS", defaults.max_hold_days),
            lookback_days: parse_or(&lookup, "SWING_PICKS_LOOKBACK_DAYS", defaults.lookback_days),
            history_range: lookup("SWING_PICKS_HISTORY_RANGE").unwrap_or(defaults.history_range),
            fees: defaults.fees,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable setting, using default");
                default
            }
        },
        None => default,
    }
}
