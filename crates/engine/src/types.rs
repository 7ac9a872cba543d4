//! Core domain types: bars, picks, outcomes

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    pub fn is_red(&self) -> bool {
        self.close < self.open
    }
}

/// What the detectors know about a ticker besides its bars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMeta {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: String,
    pub is_cdr: bool,
}

impl TickerMeta {
    pub fn new(ticker: &str, sector: &str, is_cdr: bool) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            name: None,
            sector: sector.to_string(),
            is_cdr,
        }
    }

    pub fn is_etf(&self) -> bool {
        self.sector.eq_ignore_ascii_case("etf")
    }
}

/// Confidence band derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => Confidence::High,
            55..=74 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            other => Err(format!("unknown confidence '{other}'")),
        }
    }
}

/// Lifecycle of a pick. Only `Pending` may transition, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Winner,
    Loser,
    Expired,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Winner => "winner",
            Outcome::Loser => "loser",
            Outcome::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Outcome::Pending),
            "winner" => Ok(Outcome::Winner),
            "loser" => Ok(Outcome::Loser),
            "expired" => Ok(Outcome::Expired),
            other => Err(format!("unknown outcome '{other}'")),
        }
    }
}

/// A scored, persisted trade candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub pick_hash: String,
    pub ticker: String,
    pub strategy_name: String,
    pub scan_date: NaiveDate,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub score: u8,
    pub confidence: Confidence,
    pub is_cdr: bool,
    pub fee_roundtrip: Decimal,
    pub net_profit_if_target: Decimal,
    pub risk_reward_ratio: f64,
    pub signal_snapshot: BTreeMap<String, f64>,
    pub outcome: Outcome,
    pub outcome_price: Option<f64>,
    pub outcome_pct: Option<f64>,
    pub outcome_date: Option<NaiveDate>,
}

/// Deterministic dedup key for a (ticker, day, strategy) triple
pub fn compute_pick_hash(ticker: &str, scan_date: NaiveDate, strategy_name: &str) -> String {
    let input = format!(
        "{}:{}:{}",
        ticker.to_uppercase(),
        scan_date.format("%Y-%m-%d"),
        strategy_name
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_hash_is_deterministic_and_case_insensitive() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let a = compute_pick_hash("shop.to", day, "Gap Up Momentum");
        let b = compute_pick_hash("SHOP.TO", day, "Gap Up Momentum");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let next_day = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        assert_ne!(a, compute_pick_hash("SHOP.TO", next_day, "Gap Up Momentum"));
        assert_ne!(a, compute_pick_hash("SHOP.TO", day, "Sector Leader"));
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(100), Confidence::High);
        assert_eq!(Confidence::from_score(75), Confidence::High);
        assert_eq!(Confidence::from_score(74), Confidence::Medium);
        assert_eq!(Confidence::from_score(55), Confidence::Medium);
        assert_eq!(Confidence::from_score(54), Confidence::Low);
        assert_eq!(Confidence::from_score(0), Confidence::Low);
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("Winner".parse::<Outcome>().unwrap(), Outcome::Winner);
        assert!("won".parse::<Outcome>().is_err());
        assert!(!Outcome::Pending.is_terminal());
        assert!(Outcome::Expired.is_terminal());
    }

    #[test]
    fn test_etf_detection() {
        assert!(TickerMeta::new("xiu.to", "etf", false).is_etf());
        assert!(!TickerMeta::new("AAPL", "Technology", false).is_etf());
        assert_eq!(TickerMeta::new("xiu.to", "ETF", false).ticker, "XIU.TO");
    }
}
