//! Adaptive learner
//!
//! Grades each strategy on its resolved picks and nudges target/stop
//! percentages, disables chronic losers, or leaves an advisory note.
//! Every change is persisted as a `StrategyAdjustment`.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::catalog::Strategy;
use crate::error::EngineResult;
use crate::store::{PickStore, StrategyStore};
use crate::types::{round2, Confidence, Outcome, Pick};

/// Below this many resolved picks a strategy is left alone
pub const MIN_SAMPLES: usize = 10;
/// Samples needed before a strategy can be disabled
pub const DISABLE_SAMPLES: usize = 20;

const TARGET_BOUNDS: (f64, f64) = (1.0, 25.0);
const STOP_BOUNDS: (f64, f64) = (1.0, 15.0);
const REDUCE_SIZE_ADVISORY: &str =
    "Large winners but low win rate: trade this strategy with a reduced position size";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    TargetShrink,
    TargetGrow,
    StopTighten,
    DisableLowWinRate,
    AdvisoryReduceSize,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::TargetShrink => "TARGET_SHRINK",
            ReasonCode::TargetGrow => "TARGET_GROW",
            ReasonCode::StopTighten => "STOP_TIGHTEN",
            ReasonCode::DisableLowWinRate => "DISABLE_LOW_WIN_RATE",
            ReasonCode::AdvisoryReduceSize => "ADVISORY_REDUCE_SIZE",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ReasonCode::TargetShrink,
            ReasonCode::TargetGrow,
            ReasonCode::StopTighten,
            ReasonCode::DisableLowWinRate,
            ReasonCode::AdvisoryReduceSize,
        ]
        .into_iter()
        .find(|c| c.as_str() == s)
        .ok_or_else(|| format!("unknown reason code '{s}'"))
    }
}

/// One learner action on one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAdjustment {
    pub strategy_name: String,
    /// `target_pct`, `stop_pct`, `enabled` or `advisory`
    pub field: String,
    pub old_value: Option<f64>,
    pub new_value: Option<f64>,
    pub sample_count: usize,
    pub reason_code: ReasonCode,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy_name: String,
    pub samples: usize,
    pub winners: usize,
    pub losers: usize,
    pub expired: usize,
    /// Percent of all resolved picks that were winners
    pub win_rate: f64,
    pub avg_win_pct: f64,
    /// Magnitude, always >= 0
    pub avg_loss_pct: f64,
    /// Mean outcome percent across every resolved pick
    pub expectancy_pct: f64,
    /// Gross gains over gross losses; `None` when nothing lost money
    pub profit_factor: Option<f64>,
    /// `None` below the minimum sample count
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    pub label: String,
    pub samples: usize,
    pub win_rate: f64,
    pub avg_outcome_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningReport {
    pub total_resolved: usize,
    pub strategies: Vec<StrategyStats>,
    pub score_bands: Vec<BandStats>,
    pub day_of_week: Vec<BandStats>,
    pub confidence_bands: Vec<BandStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnMode {
    #[default]
    Analyze,
    Adjust,
}

impl FromStr for LearnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analyze" => Ok(LearnMode::Analyze),
            "adjust" => Ok(LearnMode::Adjust),
            other => Err(format!("unknown learning mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningOutcome {
    pub mode: LearnMode,
    pub report: LearningReport,
    pub adjustments: Vec<StrategyAdjustment>,
}

// ============================================================================
// Statistics
// ============================================================================

fn outcome_pct(pick: &Pick) -> f64 {
    pick.outcome_pct.unwrap_or(0.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn win_rate(picks: &[&Pick]) -> f64 {
    if picks.is_empty() {
        return 0.0;
    }
    let wins = picks.iter().filter(|p| p.outcome == Outcome::Winner).count();
    wins as f64 / picks.len() as f64 * 100.0
}

fn band(label: &str, picks: &[&Pick]) -> BandStats {
    BandStats {
        label: label.to_string(),
        samples: picks.len(),
        win_rate: round2(win_rate(picks)),
        avg_outcome_pct: round2(mean(picks.iter().map(|p| outcome_pct(p)))),
    }
}

fn grade(samples: usize, win_rate: f64, expectancy: f64) -> Option<Grade> {
    if samples < MIN_SAMPLES {
        return None;
    }
    Some(if expectancy >= 2.0 && win_rate >= 55.0 {
        Grade::A
    } else if expectancy >= 1.0 {
        Grade::B
    } else if expectancy >= 0.0 {
        Grade::C
    } else if expectancy >= -1.0 {
        Grade::D
    } else {
        Grade::F
    })
}

fn strategy_stats(name: &str, picks: &[&Pick]) -> StrategyStats {
    let winners: Vec<f64> = picks
        .iter()
        .filter(|p| p.outcome == Outcome::Winner)
        .map(|p| outcome_pct(p))
        .collect();
    let losers: Vec<f64> = picks
        .iter()
        .filter(|p| p.outcome == Outcome::Loser)
        .map(|p| outcome_pct(p).abs())
        .collect();
    let expired = picks.iter().filter(|p| p.outcome == Outcome::Expired).count();

    let gross_gain: f64 = picks.iter().map(|p| outcome_pct(p)).filter(|v| *v > 0.0).sum();
    let gross_loss: f64 = picks
        .iter()
        .map(|p| outcome_pct(p))
        .filter(|v| *v < 0.0)
        .map(f64::abs)
        .sum();

    let rate = win_rate(picks);
    let expectancy = mean(picks.iter().map(|p| outcome_pct(p)));

    StrategyStats {
        strategy_name: name.to_string(),
        samples: picks.len(),
        winners: winners.len(),
        losers: losers.len(),
        expired,
        win_rate: round2(rate),
        avg_win_pct: round2(mean(winners.iter().copied())),
        avg_loss_pct: round2(mean(losers.iter().copied())),
        expectancy_pct: round2(expectancy),
        profit_factor: (gross_loss > 0.0).then(|| round2(gross_gain / gross_loss)),
        grade: grade(picks.len(), rate, expectancy),
    }
}

/// Read-only statistics over resolved picks
pub fn analyze(picks: &[Pick]) -> LearningReport {
    let resolved: Vec<&Pick> = picks.iter().filter(|p| p.outcome.is_terminal()).collect();

    let mut by_strategy: BTreeMap<&str, Vec<&Pick>> = BTreeMap::new();
    for &pick in &resolved {
        by_strategy.entry(pick.strategy_name.as_str()).or_default().push(pick);
    }
    let strategies = by_strategy
        .iter()
        .map(|(name, picks)| strategy_stats(name, picks))
        .collect();

    let score_bands = [("0-54", 0u8, 54u8), ("55-74", 55, 74), ("75-100", 75, 100)]
        .iter()
        .map(|(label, lo, hi)| {
            let members: Vec<&Pick> = resolved
                .iter()
                .copied()
                .filter(|p| p.score >= *lo && p.score <= *hi)
                .collect();
            band(label, &members)
        })
        .collect();

    let day_of_week = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let members: Vec<&Pick> = resolved
                .iter()
                .copied()
                .filter(|p| p.scan_date.weekday().num_days_from_monday() as usize == idx)
                .collect();
            band(label, &members)
        })
        .collect();

    let confidence_bands = [Confidence::High, Confidence::Medium, Confidence::Low]
        .iter()
        .map(|c| {
            let members: Vec<&Pick> = resolved
                .iter()
                .copied()
                .filter(|p| p.confidence == *c)
                .collect();
            band(c.as_str(), &members)
        })
        .collect();

    LearningReport {
        total_resolved: resolved.len(),
        strategies,
        score_bands,
        day_of_week,
        confidence_bands,
    }
}

// ============================================================================
// Adjustment rules
// ============================================================================

fn nudge(value: f64, factor: f64, bounds: (f64, f64)) -> f64 {
    round2(value * factor).clamp(bounds.0, bounds.1)
}

/// Rules for one strategy. Every rule looks at the pre-adjustment values.
pub fn plan_adjustments(strategy: &Strategy, stats: &StrategyStats) -> Vec<StrategyAdjustment> {
    let n = stats.samples;
    if n < MIN_SAMPLES {
        return Vec::new();
    }

    let wr = stats.win_rate;
    let make = |field: &str, old: Option<f64>, new: Option<f64>, code: ReasonCode, reason: String| {
        StrategyAdjustment {
            strategy_name: strategy.name.clone(),
            field: field.to_string(),
            old_value: old,
            new_value: new,
            sample_count: n,
            reason_code: code,
            reason,
        }
    };

    let mut out = Vec::new();

    if wr < 40.0 && strategy.target_pct > 3.0 {
        let new = nudge(strategy.target_pct, 0.8, TARGET_BOUNDS);
        if new != strategy.target_pct {
            out.push(make(
                "target_pct",
                Some(strategy.target_pct),
                Some(new),
                ReasonCode::TargetShrink,
                format!("Win rate {wr:.1}% below 40%: take profits earlier"),
            ));
        }
    }

    if wr > 65.0 && strategy.target_pct < 15.0 {
        let new = nudge(strategy.target_pct, 1.2, TARGET_BOUNDS);
        if new != strategy.target_pct {
            out.push(make(
                "target_pct",
                Some(strategy.target_pct),
                Some(new),
                ReasonCode::TargetGrow,
                format!("Win rate {wr:.1}% above 65%: let winners run"),
            ));
        }
    }

    if stats.avg_loss_pct > 1.5 * stats.avg_win_pct && strategy.stop_pct > 2.0 {
        let new = nudge(strategy.stop_pct, 0.8, STOP_BOUNDS);
        if new != strategy.stop_pct {
            out.push(make(
                "stop_pct",
                Some(strategy.stop_pct),
                Some(new),
                ReasonCode::StopTighten,
                format!(
                    "Average loss {:.2}% exceeds 1.5x average win {:.2}%: cut losses sooner",
                    stats.avg_loss_pct, stats.avg_win_pct
                ),
            ));
        }
    }

    if wr < 25.0 && n >= DISABLE_SAMPLES && strategy.enabled {
        out.push(make(
            "enabled",
            Some(1.0),
            Some(0.0),
            ReasonCode::DisableLowWinRate,
            format!("Win rate {wr:.1}% below 25% over {n} picks: disabled"),
        ));
    }

    if stats.avg_win_pct > 2.0 * stats.avg_loss_pct
        && wr < 45.0
        && strategy.advisory.as_deref() != Some(REDUCE_SIZE_ADVISORY)
    {
        out.push(make(
            "advisory",
            None,
            None,
            ReasonCode::AdvisoryReduceSize,
            REDUCE_SIZE_ADVISORY.to_string(),
        ));
    }

    out
}

/// A strategy is only re-tuned once `MIN_SAMPLES` more picks have resolved
/// since its last recorded adjustment
fn has_new_samples(stats: &StrategyStats, last: Option<&StrategyAdjustment>) -> bool {
    last.map_or(true, |adj| stats.samples >= adj.sample_count + MIN_SAMPLES)
}

/// The strategy as it reads once `adjustments` are applied
fn adjusted(strategy: &Strategy, adjustments: &[StrategyAdjustment]) -> Strategy {
    let mut updated = strategy.clone();
    for adj in adjustments {
        match adj.reason_code {
            ReasonCode::TargetShrink | ReasonCode::TargetGrow => {
                updated.target_pct = adj.new_value.unwrap_or(updated.target_pct);
            }
            ReasonCode::StopTighten => {
                updated.stop_pct = adj.new_value.unwrap_or(updated.stop_pct);
            }
            ReasonCode::DisableLowWinRate => updated.enabled = false,
            ReasonCode::AdvisoryReduceSize => updated.advisory = Some(adj.reason.clone()),
        }
    }
    updated
}

/// Analyze resolved picks and, in adjust mode, write the resulting changes
pub async fn learn<S>(store: &S, mode: LearnMode) -> EngineResult<LearningOutcome>
where
    S: PickStore + StrategyStore + ?Sized,
{
    let resolved = store.resolved_picks().await?;
    let report = analyze(&resolved);

    let mut adjustments = Vec::new();
    if mode == LearnMode::Adjust {
        let strategies = store.strategies().await?;
        for stats in &report.strategies {
            let Some(strategy) = strategies.iter().find(|s| s.name == stats.strategy_name) else {
                warn!(strategy = %stats.strategy_name, "Resolved picks for unknown strategy, skipping");
                continue;
            };
            let last = match store.latest_adjustment(&strategy.name).await {
                Ok(last) => last,
                Err(e) => {
                    warn!(strategy = %strategy.name, error = %e, "Failed to load adjustment history");
                    continue;
                }
            };
            if !has_new_samples(stats, last.as_ref()) {
                debug!(
                    strategy = %strategy.name,
                    samples = stats.samples,
                    "Not enough new samples since last adjustment"
                );
                continue;
            }
            let planned = plan_adjustments(strategy, stats);
            if planned.is_empty() {
                continue;
            }
            match store
                .apply_adjustments(&adjusted(strategy, &planned), &planned)
                .await
            {
                Ok(()) => {
                    for adj in &planned {
                        info!(
                            strategy = %adj.strategy_name,
                            code = %adj.reason_code,
                            old = ?adj.old_value,
                            new = ?adj.new_value,
                            samples = adj.sample_count,
                            "Strategy adjusted"
                        );
                    }
                    adjustments.extend(planned);
                }
                Err(e) => {
                    warn!(strategy = %strategy.name, error = %e, "Failed to apply adjustments");
                }
            }
        }
    }

    info!(
        mode = ?mode,
        resolved = report.total_resolved,
        adjustments = adjustments.len(),
        "Learning pass complete"
    );

    Ok(LearningOutcome {
        mode,
        report,
        adjustments,
    })
}
