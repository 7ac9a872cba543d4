//! Brokerage fee model
//!
//! Two classes of instrument: fee-free (CDRs and locally listed tickers) and
//! foreign (USD listings bought through a currency conversion).
//! Foreign legs: fee = value × fx% + shares × per-share, and the sell leg also
//! pays max(value × regulatory%, regulatory minimum).

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fee schedule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Currency conversion markup per leg, in percent (default 1.5)
    pub fx_markup_pct: Decimal,
    /// Per-share commission in USD (default 0.0035)
    pub per_share_fee: Decimal,
    /// Regulatory fee on sells, in percent of value (default 0.00278)
    pub regulatory_fee_pct: Decimal,
    /// Minimum regulatory fee per sell (default 0.01)
    pub regulatory_fee_min: Decimal,
    /// Ticker suffixes that denote a local listing
    pub local_suffixes: Vec<String>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fx_markup_pct: dec!(1.5),
            per_share_fee: dec!(0.0035),
            regulatory_fee_pct: dec!(0.00278),
            regulatory_fee_min: dec!(0.01),
            local_suffixes: [".TO", ".V", ".NE", ".CN", ".TSX"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeClass {
    FeeFree,
    Foreign,
}

/// Fees for one buy and one sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundTripFee {
    pub buy_leg: Decimal,
    pub sell_leg: Decimal,
    pub total: Decimal,
}

/// Round-trip fees for both planned exits of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub at_target: RoundTripFee,
    pub at_stop: RoundTripFee,
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl FeeConfig {
    pub fn classify(&self, ticker: &str, is_cdr: bool) -> FeeClass {
        let upper = ticker.to_uppercase();
        if is_cdr
            || self
                .local_suffixes
                .iter()
                .any(|suffix| upper.ends_with(&suffix.to_uppercase()))
        {
            FeeClass::FeeFree
        } else {
            FeeClass::Foreign
        }
    }

    /// Fees for buying `shares` at `entry` and selling at `exit`
    pub fn roundtrip(
        &self,
        shares: Decimal,
        entry: Decimal,
        exit: Decimal,
        class: FeeClass,
    ) -> RoundTripFee {
        if class == FeeClass::FeeFree || shares <= Decimal::ZERO {
            return RoundTripFee::default();
        }

        let hundred = Decimal::ONE_HUNDRED;
        let commission = shares * self.per_share_fee;

        let buy_value = shares * entry;
        let buy_leg = cents(buy_value * self.fx_markup_pct / hundred + commission);

        let sell_value = shares * exit;
        let regulatory =
            (sell_value * self.regulatory_fee_pct / hundred).max(self.regulatory_fee_min);
        let sell_leg = cents(sell_value * self.fx_markup_pct / hundred + commission + regulatory);

        RoundTripFee {
            buy_leg,
            sell_leg,
            total: buy_leg + sell_leg,
        }
    }

    /// Fees for exiting at the take-profit and at the stop-loss
    pub fn estimate(
        &self,
        shares: Decimal,
        entry: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
        class: FeeClass,
    ) -> FeeEstimate {
        FeeEstimate {
            at_target: self.roundtrip(shares, entry, take_profit, class),
            at_stop: self.roundtrip(shares, entry, stop_loss, class),
        }
    }
}
