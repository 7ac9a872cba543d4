//! Budget view: what a given cash amount buys across a set of picks

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fees::FeeConfig;
use crate::scorer::{to_cents, to_decimal};
use crate::types::{Confidence, Pick};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub ticker: String,
    pub strategy_name: String,
    pub score: u8,
    pub confidence: Confidence,
    pub is_cdr: bool,
    pub entry_price: Decimal,
    pub shares: Decimal,
    pub cost: Decimal,
    pub fees_at_target: Decimal,
    pub fees_at_stop: Decimal,
    pub net_at_target: Decimal,
    pub net_at_stop: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetView {
    pub amount: Decimal,
    pub lines: Vec<BudgetLine>,
    /// Picks whose entry price exceeds the amount
    pub unaffordable: usize,
}

/// Size every affordable pick as if the whole `amount` went into it
pub fn budget_view(picks: &[Pick], amount: Decimal, fees: &FeeConfig) -> EngineResult<BudgetView> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidBudget(amount));
    }

    let mut lines = Vec::new();
    let mut unaffordable = 0;

    for pick in picks {
        let entry = to_decimal(pick.entry_price);
        if entry <= Decimal::ZERO || entry > amount {
            unaffordable += 1;
            continue;
        }

        let shares = (amount / entry).floor();
        let target = to_decimal(pick.take_profit_price);
        let stop = to_decimal(pick.stop_loss_price);
        let class = fees.classify(&pick.ticker, pick.is_cdr);
        let estimate = fees.estimate(shares, entry, target, stop, class);

        lines.push(BudgetLine {
            ticker: pick.ticker.clone(),
            strategy_name: pick.strategy_name.clone(),
            score: pick.score,
            confidence: pick.confidence,
            is_cdr: pick.is_cdr,
            entry_price: entry,
            shares,
            cost: to_cents(shares * entry),
            fees_at_target: estimate.at_target.total,
            fees_at_stop: estimate.at_stop.total,
            net_at_target: to_cents(shares * (target - entry) - estimate.at_target.total),
            net_at_stop: to_cents(shares * (stop - entry) - estimate.at_stop.total),
        });
    }

    Ok(BudgetView {
        amount,
        lines,
        unaffordable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::date;
    use crate::types::{compute_pick_hash, Outcome};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn pick(ticker: &str, entry: f64, is_cdr: bool) -> Pick {
        Pick {
            pick_hash: compute_pick_hash(ticker, date(2026, 3, 2), "Volume Breakout"),
            ticker: ticker.to_string(),
            strategy_name: "Volume Breakout".to_string(),
            scan_date: date(2026, 3, 2),
            entry_price: entry,
            stop_loss_price: entry * 0.98,
            take_profit_price: entry * 1.05,
            stop_loss_pct: 2.0,
            take_profit_pct: 5.0,
            score: 70,
            confidence: Confidence::Medium,
            is_cdr,
            fee_roundtrip: Decimal::ZERO,
            net_profit_if_target: Decimal::ZERO,
            risk_reward_ratio: 2.5,
            signal_snapshot: BTreeMap::new(),
            outcome: Outcome::Pending,
            outcome_price: None,
            outcome_pct: None,
            outcome_date: None,
        }
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let picks = vec![pick("AAPL", 100.0, false)];
        let fees = FeeConfig::default();
        assert!(matches!(
            budget_view(&picks, Decimal::ZERO, &fees),
            Err(EngineError::InvalidBudget(_))
        ));
        assert!(matches!(
            budget_view(&picks, dec!(-50), &fees),
            Err(EngineError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_foreign_position_pays_fees_on_both_exits() {
        let view = budget_view(&[pick("AAPL", 100.0, false)], dec!(1050), &FeeConfig::default())
            .unwrap();
        let line = &view.lines[0];

        assert_eq!(line.shares, dec!(10));
        assert_eq!(line.cost, dec!(1000));
        // sell at 105: 15.04 + 15.81; sell at 98: 15.04 + 14.76
        assert_eq!(line.fees_at_target, dec!(30.85));
        assert_eq!(line.fees_at_stop, dec!(29.80));
        assert_eq!(line.net_at_target, dec!(19.15));
        assert_eq!(line.net_at_stop, dec!(-49.80));
    }

    #[test]
    fn test_cdr_position_is_fee_free() {
        let view =
            budget_view(&[pick("SHOP.NE", 50.0, true)], dec!(500), &FeeConfig::default()).unwrap();
        let line = &view.lines[0];
        assert_eq!(line.shares, dec!(10));
        assert_eq!(line.fees_at_target, Decimal::ZERO);
        assert_eq!(line.fees_at_stop, Decimal::ZERO);
        assert_eq!(line.net_at_target, dec!(25));
        assert_eq!(line.net_at_stop, dec!(-10));
    }

    #[test]
    fn test_skips_picks_above_amount() {
        let picks = vec![pick("NVDA", 900.0, false), pick("F", 12.0, false)];
        let view = budget_view(&picks, dec!(100), &FeeConfig::default()).unwrap();
        assert_eq!(view.unaffordable, 1);
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].ticker, "F");
        assert_eq!(view.lines[0].shares, dec!(8));
    }
}
