//! Strategy configuration and the built-in catalog

use serde::{Deserialize, Serialize};

use crate::detectors::{DetectorKind, StrategyParams};

/// A named, independently enable-able detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub family: String,
    pub detector: DetectorKind,
    pub ideal_hold_days: u32,
    pub default_target_pct: f64,
    pub default_stop_pct: f64,
    pub target_pct: f64,
    pub stop_pct: f64,
    pub enabled: bool,
    pub advisory: Option<String>,
}

impl Strategy {
    pub fn params(&self) -> StrategyParams {
        StrategyParams {
            target_pct: self.target_pct,
            stop_pct: self.stop_pct,
            default_target_pct: self.default_target_pct,
            default_stop_pct: self.default_stop_pct,
        }
    }
}

fn entry(
    name: &str,
    family: &str,
    detector: DetectorKind,
    ideal_hold_days: u32,
    target_pct: f64,
    stop_pct: f64,
) -> Strategy {
    Strategy {
        name: name.to_string(),
        family: family.to_string(),
        detector,
        ideal_hold_days,
        default_target_pct: target_pct,
        default_stop_pct: stop_pct,
        target_pct,
        stop_pct,
        enabled: true,
        advisory: None,
    }
}

/// The eight strategies seeded into a fresh database
pub fn default_catalog() -> Vec<Strategy> {
    vec![
        entry("Gap Up Momentum", "momentum", DetectorKind::GapUp, 3, 6.0, 3.0),
        entry("Volume Breakout", "breakout", DetectorKind::VolumeBreakout, 5, 8.0, 4.0),
        entry("Oversold Bounce", "reversal", DetectorKind::OversoldBounce, 5, 6.0, 4.0),
        entry("Momentum Continuation", "trend", DetectorKind::MomentumContinuation, 7, 6.0, 3.0),
        entry("Earnings Catalyst", "catalyst", DetectorKind::EarningsCatalyst, 10, 10.0, 5.0),
        entry("Zero Fee Priority", "fee_advantage", DetectorKind::ZeroFeePriority, 5, 4.0, 2.0),
        entry("Sector Leader", "relative_strength", DetectorKind::SectorLeader, 5, 5.0, 2.5),
        entry("Mean Reversion Sniper", "mean_reversion", DetectorKind::MeanReversionSniper, 5, 8.0, 5.0),
    ]
}
