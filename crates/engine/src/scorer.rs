//! Turns detector signals into scored, fee-aware picks

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::detectors::Signal;
use crate::fees::FeeConfig;
use crate::types::{compute_pick_hash, round2, Confidence, Outcome, Pick, TickerMeta};

/// Extra points for fee-free tickers when the detector didn't already add them
pub const CDR_BONUS: f64 = 10.0;

/// Notional position used for the fee and net-profit estimate stored on each pick
pub const REFERENCE_POSITION: Decimal = dec!(1000);

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(4)
}

pub fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn risk_reward(take_profit_pct: f64, stop_loss_pct: f64) -> f64 {
    if stop_loss_pct <= 0.0 {
        0.0
    } else {
        take_profit_pct / stop_loss_pct
    }
}

/// Bracketed bonus for the reward/risk ratio
pub fn rr_bonus(rr: f64) -> f64 {
    if rr >= 3.0 {
        20.0
    } else if rr >= 2.0 {
        15.0
    } else if rr >= 1.5 {
        10.0
    } else {
        5.0
    }
}

/// Sum of the detector's parts plus bonuses, clamped to 0..=100
pub fn final_score(signal: &Signal, is_cdr: bool) -> u8 {
    let parts: f64 = signal.score_parts.values().sum();
    let cdr = if is_cdr && !signal.cdr_bonus_included {
        CDR_BONUS
    } else {
        0.0
    };
    let rr = risk_reward(signal.take_profit_pct, signal.stop_loss_pct);
    let total = (parts + cdr + rr_bonus(rr)).round();
    total.clamp(0.0, 100.0) as u8
}

/// Whole shares a position of `amount` buys at `entry`, at least one
pub fn shares_for(amount: Decimal, entry: Decimal) -> Decimal {
    if entry <= Decimal::ZERO {
        return Decimal::ONE;
    }
    (amount / entry).floor().max(Decimal::ONE)
}

/// Build a pending pick from a signal
pub fn build_pick(
    meta: &TickerMeta,
    strategy_name: &str,
    scan_date: NaiveDate,
    signal: &Signal,
    fees: &FeeConfig,
) -> Pick {
    let entry = signal.entry_price;
    let take_profit_price = entry * (1.0 + signal.take_profit_pct / 100.0);
    let stop_loss_price = entry * (1.0 - signal.stop_loss_pct / 100.0);

    let score = final_score(signal, meta.is_cdr);
    let rr = risk_reward(signal.take_profit_pct, signal.stop_loss_pct);

    let entry_dec = to_decimal(entry);
    let target_dec = to_decimal(take_profit_price);
    let shares = shares_for(REFERENCE_POSITION, entry_dec);
    let class = fees.classify(&meta.ticker, meta.is_cdr);
    let fee = fees.roundtrip(shares, entry_dec, target_dec, class);
    let net_profit = to_cents(shares * (target_dec - entry_dec) - fee.total);

    Pick {
        pick_hash: compute_pick_hash(&meta.ticker, scan_date, strategy_name),
        ticker: meta.ticker.to_uppercase(),
        strategy_name: strategy_name.to_string(),
        scan_date,
        entry_price: entry,
        stop_loss_price: (stop_loss_price * 10_000.0).round() / 10_000.0,
        take_profit_price: (take_profit_price * 10_000.0).round() / 10_000.0,
        stop_loss_pct: round2(signal.stop_loss_pct),
        take_profit_pct: round2(signal.take_profit_pct),
        score,
        confidence: Confidence::from_score(score),
        is_cdr: meta.is_cdr,
        fee_roundtrip: fee.total,
        net_profit_if_target: net_profit,
        risk_reward_ratio: round2(rr),
        signal_snapshot: signal.snapshot.clone(),
        outcome: Outcome::Pending,
        outcome_price: None,
        outcome_pct: None,
        outcome_date: None,
    }
}

/// Score descending, then ticker, then strategy name
pub fn rank_picks(picks: &mut [Pick]) {
    picks.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.ticker.cmp(&b.ticker))
            .then_with(|| a.strategy_name.cmp(&b.strategy_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn signal(parts: &[(&str, f64)], tp: f64, sl: f64, cdr_included: bool) -> Signal {
        Signal {
            entry_price: 100.0,
            take_profit_pct: tp,
            stop_loss_pct: sl,
            score_parts: parts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            snapshot: BTreeMap::new(),
            cdr_bonus_included: cdr_included,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_rr_brackets() {
        assert_eq!(rr_bonus(3.0), 20.0);
        assert_eq!(rr_bonus(2.5), 15.0);
        assert_eq!(rr_bonus(1.5), 10.0);
        assert_eq!(rr_bonus(1.0), 5.0);
        assert_eq!(risk_reward(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let high = signal(&[("base", 25.0), ("gap", 30.0), ("volume", 25.0)], 9.0, 3.0, false);
        assert_eq!(final_score(&high, true), 100);

        let low = signal(&[("base", -50.0)], 2.0, 2.0, false);
        assert_eq!(final_score(&low, false), 0);
    }

    #[test]
    fn test_cdr_bonus_not_double_counted() {
        let s = signal(&[("base", 20.0), ("fee_waiver", 15.0)], 4.0, 2.0, true);
        // 35 parts + 15 rr
        assert_eq!(final_score(&s, true), 50);

        let s = signal(&[("base", 20.0)], 4.0, 2.0, false);
        assert_eq!(final_score(&s, true), 45);
        assert_eq!(final_score(&s, false), 35);
    }

    #[test]
    fn test_build_pick_prices_and_fees() {
        let s = signal(&[("base", 25.0), ("gap", 20.0), ("volume", 24.0), ("green_close", 10.0)], 5.0, 2.0, false);
        let pick = build_pick(&TickerMeta::new("aapl", "Technology", false), "Gap Up Momentum", day(), &s, &FeeConfig::default());

        assert_eq!(pick.ticker, "AAPL");
        assert_eq!(pick.take_profit_price, 105.0);
        assert_eq!(pick.stop_loss_price, 98.0);
        assert_eq!(pick.risk_reward_ratio, 2.5);
        // 79 + 15
        assert_eq!(pick.score, 94);
        assert_eq!(pick.confidence, Confidence::High);
        assert_eq!(pick.outcome, Outcome::Pending);
        // 10 shares: fees 30.85, gross 50
        assert_eq!(pick.fee_roundtrip, dec!(30.85));
        assert_eq!(pick.net_profit_if_target, dec!(19.15));
    }

    #[test]
    fn test_build_pick_cdr_has_no_fees() {
        let s = signal(&[("base", 25.0)], 5.0, 2.0, false);
        let pick = build_pick(&TickerMeta::new("SHOP.TO", "Technology", false), "Sector Leader", day(), &s, &FeeConfig::default());
        assert_eq!(pick.fee_roundtrip, Decimal::ZERO);
        assert_eq!(pick.net_profit_if_target, dec!(50));
    }

    #[test]
    fn test_shares_minimum_one() {
        assert_eq!(shares_for(dec!(1000), dec!(1500)), Decimal::ONE);
        assert_eq!(shares_for(dec!(1000), dec!(33)), dec!(30));
    }

    #[test]
    fn test_rank_ties_break_on_ticker_then_strategy() {
        let s = signal(&[("base", 40.0)], 5.0, 2.0, false);
        let fees = FeeConfig::default();
        let mut picks = vec![
            build_pick(&TickerMeta::new("MSFT", "Tech", false), "B", day(), &s, &fees),
            build_pick(&TickerMeta::new("AAPL", "Tech", false), "B", day(), &s, &fees),
            build_pick(&TickerMeta::new("AAPL", "Tech", false), "A", day(), &s, &fees),
        ];
        let better = signal(&[("base", 60.0)], 5.0, 2.0, false);
        picks.push(build_pick(&TickerMeta::new("ZZZ", "Tech", false), "A", day(), &better, &fees));

        rank_picks(&mut picks);
        let order: Vec<(&str, &str)> = picks
            .iter()
            .map(|p| (p.ticker.as_str(), p.strategy_name.as_str()))
            .collect();
        assert_eq!(order, vec![("ZZZ", "A"), ("AAPL", "A"), ("AAPL", "B"), ("MSFT", "B")]);
    }
}
