//! Strategy detectors
//!
//! Eight independent pattern detectors behind one closed enum. Each looks at
//! the latest bar of a ticker's history and either produces a `Signal` or
//! nothing. Thresholds are fixed; only target/stop percentages are tunable,
//! through `StrategyParams`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::indicators::{
    atr, avg_volume, bollinger, consecutive_red, highest_high, lowest_low, pct_change, rsi, sma,
    volume_ratio, z_score,
};
use crate::types::{Bar, TickerMeta};

const DEFAULT_MIN_BARS: usize = 21;
const LONG_MIN_BARS: usize = 60;
const VOLUME_LOOKBACK: usize = 20;
const SNIPER_LIQUIDITY_FLOOR: f64 = 100_000.0;

/// Output of a detector that fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub entry_price: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    /// Named score contributions; summed by the scorer
    pub score_parts: BTreeMap<String, f64>,
    /// Indicator values at detection time, stored with the pick
    pub snapshot: BTreeMap<String, f64>,
    /// Set when the detector already rewarded the ticker for being fee-free
    pub cdr_bonus_included: bool,
}

/// Tunable percentages for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub target_pct: f64,
    pub stop_pct: f64,
    pub default_target_pct: f64,
    pub default_stop_pct: f64,
}

impl StrategyParams {
    pub fn fixed(target_pct: f64, stop_pct: f64) -> Self {
        Self {
            target_pct,
            stop_pct,
            default_target_pct: target_pct,
            default_stop_pct: stop_pct,
        }
    }

    /// How far the learner has moved the target away from its default
    pub fn target_scale(&self) -> f64 {
        if self.default_target_pct > 0.0 {
            self.target_pct / self.default_target_pct
        } else {
            1.0
        }
    }

    pub fn stop_scale(&self) -> f64 {
        if self.default_stop_pct > 0.0 {
            self.stop_pct / self.default_stop_pct
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    GapUp,
    VolumeBreakout,
    OversoldBounce,
    MomentumContinuation,
    EarningsCatalyst,
    ZeroFeePriority,
    SectorLeader,
    MeanReversionSniper,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 8] = [
        DetectorKind::GapUp,
        DetectorKind::VolumeBreakout,
        DetectorKind::OversoldBounce,
        DetectorKind::MomentumContinuation,
        DetectorKind::EarningsCatalyst,
        DetectorKind::ZeroFeePriority,
        DetectorKind::SectorLeader,
        DetectorKind::MeanReversionSniper,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            DetectorKind::GapUp => "gap_up",
            DetectorKind::VolumeBreakout => "volume_breakout",
            DetectorKind::OversoldBounce => "oversold_bounce",
            DetectorKind::MomentumContinuation => "momentum_continuation",
            DetectorKind::EarningsCatalyst => "earnings_catalyst",
            DetectorKind::ZeroFeePriority => "zero_fee_priority",
            DetectorKind::SectorLeader => "sector_leader",
            DetectorKind::MeanReversionSniper => "mean_reversion_sniper",
        }
    }

    /// Bars of history needed before the detector will look at a ticker
    pub fn min_bars(&self) -> usize {
        match self {
            DetectorKind::MomentumContinuation | DetectorKind::MeanReversionSniper => LONG_MIN_BARS,
            _ => DEFAULT_MIN_BARS,
        }
    }

    pub fn detect(
        &self,
        bars: &[Bar],
        meta: &TickerMeta,
        params: &StrategyParams,
    ) -> Option<Signal> {
        if bars.len() < self.min_bars() {
            return None;
        }
        let latest = bars.last()?;
        if latest.close <= 0.0 {
            return None;
        }

        match self {
            DetectorKind::GapUp => gap_up(bars, params),
            DetectorKind::VolumeBreakout => volume_breakout(bars, params),
            DetectorKind::OversoldBounce => oversold_bounce(bars, params),
            DetectorKind::MomentumContinuation => momentum_continuation(bars, params),
            DetectorKind::EarningsCatalyst => earnings_catalyst(bars, params),
            DetectorKind::ZeroFeePriority => zero_fee_priority(bars, meta, params),
            DetectorKind::SectorLeader => sector_leader(bars, meta, params),
            DetectorKind::MeanReversionSniper => mean_reversion_sniper(bars, params),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorKind::ALL
            .iter()
            .copied()
            .find(|k| k.key() == s)
            .ok_or_else(|| format!("unknown detector '{s}'"))
    }
}

// ============================================================================
// Signal construction
// ============================================================================

struct SignalBuilder {
    signal: Signal,
}

impl SignalBuilder {
    fn new(entry_price: f64, take_profit_pct: f64, stop_loss_pct: f64, base: f64) -> Self {
        let mut score_parts = BTreeMap::new();
        score_parts.insert("base".to_string(), base);
        Self {
            signal: Signal {
                entry_price,
                take_profit_pct,
                stop_loss_pct,
                score_parts,
                snapshot: BTreeMap::new(),
                cdr_bonus_included: false,
            },
        }
    }

    fn part(mut self, name: &str, value: f64) -> Self {
        self.signal.score_parts.insert(name.to_string(), value);
        self
    }

    fn snap(mut self, name: &str, value: f64) -> Self {
        self.signal.snapshot.insert(name.to_string(), value);
        self
    }

    fn cdr_bonus(mut self) -> Self {
        self.signal.cdr_bonus_included = true;
        self
    }

    fn build(self) -> Option<Signal> {
        Some(self.signal)
    }
}

// ============================================================================
// Detectors
// ============================================================================

fn gap_up(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let (latest, prior) = bars.split_last()?;
    let prev_close = prior.last()?.close;
    let gap = pct_change(prev_close, latest.open)?;
    let ratio = volume_ratio(bars, VOLUME_LOOKBACK)?;

    if gap < 3.0 || ratio < 1.5 {
        return None;
    }

    let target = (1.5 * gap * params.target_scale()).clamp(3.0, 20.0);
    let stop = (0.5 * gap * params.stop_scale()).clamp(1.5, 8.0);

    SignalBuilder::new(latest.close, target, stop, 25.0)
        .part("gap", (gap * 4.0).min(30.0))
        .part("volume", (ratio * 8.0).min(25.0))
        .part("green_close", if latest.is_green() { 10.0 } else { 0.0 })
        .snap("gap_pct", gap)
        .snap("volume_ratio", ratio)
        .build()
}

fn volume_breakout(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let (latest, prior) = bars.split_last()?;
    let ratio = volume_ratio(bars, VOLUME_LOOKBACK)?;
    let prior_high = highest_high(prior, 20)?;
    let rsi14 = rsi(bars, 14)?;
    let atr14 = atr(bars, 14)?;

    if ratio < 2.5 || latest.high < 0.98 * prior_high || rsi14 > 80.0 {
        return None;
    }

    let atr_pct = atr14 / latest.close * 100.0;
    let target = (2.0 * atr_pct * params.target_scale()).clamp(3.0, 15.0);
    let stop = (atr_pct * params.stop_scale()).clamp(1.5, 8.0);

    SignalBuilder::new(latest.close, target, stop, 25.0)
        .part("volume", (ratio * 6.0).min(30.0))
        .part("new_high", if latest.high > prior_high { 10.0 } else { 0.0 })
        .part("rsi_room", ((80.0 - rsi14) / 4.0).clamp(0.0, 10.0))
        .snap("volume_ratio", ratio)
        .snap("high_20", prior_high)
        .snap("rsi_14", rsi14)
        .snap("atr_14", atr14)
        .build()
}

fn oversold_bounce(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let latest = bars.last()?;
    let rsi14 = rsi(bars, 14)?;
    let bb = bollinger(bars, 20, 2.0)?;
    let red = consecutive_red(bars);
    let low5 = lowest_low(bars, 5)?;

    if rsi14 > 35.0 || latest.close > bb.lower * 1.02 || red < 2 || !latest.is_green() {
        return None;
    }

    let close = latest.close;
    let target = ((bb.middle - close) / close * 100.0 * params.target_scale()).clamp(2.0, 12.0);
    let stop = (((close - low5) / close * 100.0 + 1.0) * params.stop_scale()).clamp(2.0, 8.0);

    SignalBuilder::new(close, target, stop, 25.0)
        .part("oversold", (35.0 - rsi14).clamp(0.0, 20.0))
        .part("red_streak", (red as f64 * 4.0).min(12.0))
        .part("reversal", 10.0)
        .part("below_band", if close < bb.lower { 8.0 } else { 0.0 })
        .snap("rsi_14", rsi14)
        .snap("bb_lower", bb.lower)
        .snap("bb_middle", bb.middle)
        .snap("red_candles", red as f64)
        .snap("low_5", low5)
        .build()
}

fn momentum_continuation(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let latest = bars.last()?;
    let sma20 = sma(bars, 20)?;
    let sma50 = sma(bars, 50)?;
    let ratio = volume_ratio(bars, VOLUME_LOOKBACK)?;
    let high10 = highest_high(bars, 10)?;

    let distance = (latest.close - sma20).abs() / sma20 * 100.0;
    if sma20 <= sma50 || distance > 2.0 || !latest.is_green() || ratio < 0.8 {
        return None;
    }

    let close = latest.close;
    let target = ((high10 - close) / close * 100.0 * params.target_scale()).clamp(2.0, 12.0);
    let stop = (((close - sma50) / close * 100.0 + 0.5) * params.stop_scale()).clamp(2.0, 8.0);

    SignalBuilder::new(close, target, stop, 25.0)
        .part("trend", ((sma20 - sma50) / sma50 * 100.0 * 3.0).clamp(0.0, 20.0))
        .part("pullback", ((2.0 - distance) * 5.0).clamp(0.0, 10.0))
        .part("volume", (ratio * 5.0).min(10.0))
        .snap("sma_20", sma20)
        .snap("sma_50", sma50)
        .snap("high_10", high10)
        .snap("volume_ratio", ratio)
        .build()
}

fn earnings_catalyst(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let latest = bars.last()?;
    let len = bars.len();

    // Most recent qualifying day within the last five bars
    let first = len.saturating_sub(5).max(VOLUME_LOOKBACK);
    let (day, ret, vol_ratio) = (first..len).rev().find_map(|i| {
        let ret = pct_change(bars[i - 1].close, bars[i].close)?;
        let vol_ratio = volume_ratio(&bars[..=i], VOLUME_LOOKBACK)?;
        (ret >= 5.0 && vol_ratio >= 2.5).then_some((i, ret, vol_ratio))
    })?;
    let days_ago = (len - 1 - day) as f64;

    SignalBuilder::new(latest.close, params.target_pct, params.stop_pct, 25.0)
        .part("move", (ret * 2.0).min(25.0))
        .part("volume", (vol_ratio * 4.0).min(20.0))
        .part("recency", 10.0 - 2.0 * days_ago)
        .snap("catalyst_return_pct", ret)
        .snap("catalyst_volume_ratio", vol_ratio)
        .snap("days_since_catalyst", days_ago)
        .build()
}

fn zero_fee_priority(bars: &[Bar], meta: &TickerMeta, params: &StrategyParams) -> Option<Signal> {
    if !meta.is_cdr {
        return None;
    }
    let latest = bars.last()?;
    let sma20 = sma(bars, 20)?;
    let rsi14 = rsi(bars, 14)?;
    let ratio = volume_ratio(bars, VOLUME_LOOKBACK)?;

    let trending = latest.close > sma20 && rsi14 < 70.0;
    let volume_spike = ratio >= 1.8;
    let oversold = rsi14 < 35.0;
    if !(trending || volume_spike || oversold) {
        return None;
    }

    SignalBuilder::new(latest.close, params.target_pct, params.stop_pct, 20.0)
        .part("fee_waiver", 15.0)
        .part("trend", if trending { 10.0 } else { 0.0 })
        .part("volume", if volume_spike { (ratio * 5.0).min(15.0) } else { 0.0 })
        .part("oversold", if oversold { 10.0 } else { 0.0 })
        .snap("sma_20", sma20)
        .snap("rsi_14", rsi14)
        .snap("volume_ratio", ratio)
        .cdr_bonus()
        .build()
}

fn sector_leader(bars: &[Bar], meta: &TickerMeta, params: &StrategyParams) -> Option<Signal> {
    if meta.is_etf() {
        return None;
    }
    let latest = bars.last()?;
    let five_ago = bars.get(bars.len().checked_sub(6)?)?;
    let ret5 = pct_change(five_ago.close, latest.close)?;
    let ratio = volume_ratio(bars, VOLUME_LOOKBACK)?;

    if ret5 < 3.0 || ratio < 1.0 {
        return None;
    }

    SignalBuilder::new(latest.close, params.target_pct, params.stop_pct, 25.0)
        .part("momentum", (ret5 * 3.0).min(25.0))
        .part("volume", (ratio * 5.0).min(15.0))
        .snap("return_5d_pct", ret5)
        .snap("volume_ratio", ratio)
        .build()
}

fn mean_reversion_sniper(bars: &[Bar], params: &StrategyParams) -> Option<Signal> {
    let latest = bars.last()?;
    let z20 = z_score(bars, 20)?;
    let sma20 = sma(bars, 20)?;
    let sma50 = sma(bars, 50)?;
    let sma50_prior = sma(&bars[..bars.len() - 10], 50)?;
    let avg_vol = avg_volume(bars, 20)?;
    let wide = bollinger(bars, 20, 3.0)?;

    if z20 > -1.8 || sma50 < sma50_prior || avg_vol < SNIPER_LIQUIDITY_FLOOR {
        return None;
    }

    let close = latest.close;
    let target = ((sma20 - close) / close * 100.0 * params.target_scale()).clamp(2.0, 15.0);
    let stop = (((close - wide.lower) / close * 100.0 + 1.0) * params.stop_scale()).clamp(2.0, 10.0);

    SignalBuilder::new(close, target, stop, 30.0)
        .part("stretch", (z20.abs() * 8.0).min(25.0))
        .part("trend", 10.0)
        .part("liquidity", if avg_vol >= 1_000_000.0 { 5.0 } else { 0.0 })
        .snap("z_score_20", z20)
        .snap("sma_20", sma20)
        .snap("sma_50", sma50)
        .snap("sma_50_prior", sma50_prior)
        .snap("avg_volume_20", avg_vol)
        .snap("bb_lower_3", wide.lower)
        .build()
}
