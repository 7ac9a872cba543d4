//! Technical indicators over daily bars
//!
//! Every function looks at the most recent `n` bars of a chronologically
//! ordered slice and returns `None` when there is not enough history.
//! Moving averages, standard deviation and rolling extremes are driven
//! through `ta`'s streaming indicators; RSI and ATR use the simple-average
//! form (not Wilder smoothing) so a single window fully determines them.

use serde::{Deserialize, Serialize};
use ta::indicators::{Maximum, Minimum, SimpleMovingAverage, StandardDeviation};
use ta::Next;

use crate::types::Bar;

/// Bollinger band values at the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std_dev: f64,
}

/// The last `n` bars, if there are at least `n`
fn tail(bars: &[Bar], n: usize) -> Option<&[Bar]> {
    if n == 0 || bars.len() < n {
        None
    } else {
        Some(&bars[bars.len() - n..])
    }
}

/// Feed a series through a streaming indicator and keep the final value
fn stream<I>(mut indicator: I, values: impl Iterator<Item = f64>) -> Option<f64>
where
    I: Next<f64, Output = f64>,
{
    values.fold(None, |_, v| Some(indicator.next(v)))
}

fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    let mean = stream(SimpleMovingAverage::new(n).ok()?, values.iter().copied())?;
    let std = stream(StandardDeviation::new(n).ok()?, values.iter().copied())?;
    // ta can return a NaN for a perfectly flat series; max() maps it to 0
    Some((mean, std.max(0.0)))
}

// ============================================================================
// Averages and bands
// ============================================================================

/// Simple moving average of the last `n` closes
pub fn sma(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n)?;
    stream(
        SimpleMovingAverage::new(n).ok()?,
        window.iter().map(|b| b.close),
    )
}

/// Average volume of the last `n` bars
pub fn avg_volume(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n)?;
    stream(
        SimpleMovingAverage::new(n).ok()?,
        window.iter().map(|b| b.volume),
    )
}

/// Bollinger bands with population standard deviation
pub fn bollinger(bars: &[Bar], n: usize, k: f64) -> Option<BollingerOutput> {
    let window = tail(bars, n)?;
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let (middle, std_dev) = mean_std(&closes)?;
    Some(BollingerOutput {
        upper: middle + k * std_dev,
        middle,
        lower: middle - k * std_dev,
        std_dev,
    })
}

/// (close - mean) / std over the last `n` closes. Zero when the series is flat.
pub fn z_score(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n)?;
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let (mean, std) = mean_std(&closes)?;
    let last = *closes.last()?;
    if std <= f64::EPSILON {
        Some(0.0)
    } else {
        Some((last - mean) / std)
    }
}

// ============================================================================
// Oscillators and ranges
// ============================================================================

/// RSI over the last `n` close-to-close changes (needs `n + 1` bars)
pub fn rsi(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n + 1)?;
    if n == 0 {
        return None;
    }

    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1].close - w[0].close)
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / n as f64;
    let avg_loss = losses / n as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Mean true range of the last `n` bars (needs `n + 1` bars)
pub fn atr(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n + 1)?;
    if n == 0 {
        return None;
    }

    let total: f64 = window
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let bar = &w[1];
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .sum();

    Some(total / n as f64)
}

/// Highest high of the last `n` bars
pub fn highest_high(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n)?;
    stream(Maximum::new(n).ok()?, window.iter().map(|b| b.high))
}

/// Lowest low of the last `n` bars
pub fn lowest_low(bars: &[Bar], n: usize) -> Option<f64> {
    let window = tail(bars, n)?;
    stream(Minimum::new(n).ok()?, window.iter().map(|b| b.low))
}

/// Red candles immediately before the latest bar, counted backward until one isn't red
pub fn consecutive_red(bars: &[Bar]) -> usize {
    match bars.split_last() {
        Some((_, prior)) => prior.iter().rev().take_while(|b| b.is_red()).count(),
        None => 0,
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Latest volume over the average of the `n` bars before it
pub fn volume_ratio(bars: &[Bar], n: usize) -> Option<f64> {
    let (latest, prior) = bars.split_last()?;
    let avg = avg_volume(prior, n)?;
    if avg <= 0.0 {
        return None;
    }
    Some(latest.volume / avg)
}

/// Percent change from `from` to `to`
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some((to - from) / from * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: start + chrono::Days::new(i as u64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_sma_uses_latest_window() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(approx(sma(&bars, 3).unwrap(), 4.0));
        assert!(approx(sma(&bars, 5).unwrap(), 3.0));
        assert!(sma(&bars, 6).is_none());
        assert!(sma(&bars, 0).is_none());
    }

    #[test]
    fn test_rsi_needs_n_plus_one_bars() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        assert!(rsi(&bars, 3).is_none());
        assert!(rsi(&bars, 2).is_some());
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(rsi(&bars, 4), Some(100.0));
    }

    #[test]
    fn test_rsi_balanced_moves_is_50() {
        let bars = make_bars(&[10.0, 11.0, 10.0, 11.0, 10.0]);
        assert!(approx(rsi(&bars, 4).unwrap(), 50.0));
    }

    #[test]
    fn test_atr_includes_gaps() {
        // prev close 10, bar range 11..9 on close 10 -> TR 2; a gap to 20 -> TR |21 - 10| = 11
        let bars = make_bars(&[10.0, 10.0, 20.0]);
        assert!(approx(atr(&bars, 1).unwrap(), 11.0));
        assert!(approx(atr(&bars, 2).unwrap(), 6.5));
    }

    #[test]
    fn test_bollinger_population_std() {
        let bars = make_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bb = bollinger(&bars, 8, 2.0).unwrap();
        assert!(approx(bb.middle, 5.0));
        assert!(approx(bb.std_dev, 2.0));
        assert!(approx(bb.upper, 9.0));
        assert!(approx(bb.lower, 1.0));
    }

    #[test]
    fn test_z_score_flat_series_is_zero() {
        let bars = make_bars(&[5.0; 20]);
        assert_eq!(z_score(&bars, 20), Some(0.0));
    }

    #[test]
    fn test_z_score_sign() {
        let mut closes = vec![10.0; 19];
        closes.push(8.0);
        let z = z_score(&make_bars(&closes), 20).unwrap();
        assert!(z < -4.0);
    }

    #[test]
    fn test_highest_and_lowest() {
        let bars = make_bars(&[5.0, 9.0, 3.0, 4.0]);
        assert!(approx(highest_high(&bars, 4).unwrap(), 10.0));
        assert!(approx(highest_high(&bars, 2).unwrap(), 5.0));
        assert!(approx(lowest_low(&bars, 3).unwrap(), 2.0));
    }

    #[test]
    fn test_consecutive_red_stops_at_first_non_red() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0, 10.0, 10.0]);
        // green, red, red, (latest)
        bars[1].open = 9.0;
        bars[2].open = 11.0;
        bars[3].open = 11.0;
        assert_eq!(consecutive_red(&bars), 2);
        assert_eq!(consecutive_red(&bars[..1]), 0);
        assert_eq!(consecutive_red(&[]), 0);
    }

    #[test]
    fn test_volume_ratio_excludes_latest_bar() {
        let mut bars = make_bars(&[1.0, 1.0, 1.0, 1.0]);
        bars[3].volume = 3000.0;
        assert!(approx(volume_ratio(&bars, 3).unwrap(), 3.0));
        assert!(volume_ratio(&bars, 4).is_none());
    }

    #[test]
    fn test_pct_change() {
        assert!(approx(pct_change(100.0, 105.0).unwrap(), 5.0));
        assert!(pct_change(0.0, 1.0).is_none());
    }
}
