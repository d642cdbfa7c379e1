//! RSI (Relative Strength Index) indicator.
//!
//! Average gain and loss are the **simple rolling mean** of the last n
//! close-to-close changes. This is not Wilder's smoothing, so values differ
//! from textbook RSI; the rolling-mean form is kept deliberately so that
//! signals match the historical reports built on it.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! Sentinels: avg_loss == 0 and avg_gain > 0 → 100; both zero (flat) → 50.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries::undefined(IndicatorType::Rsi(period), bars);
    }

    let mut gains: Vec<f64> = vec![0.0; bars.len()];
    let mut losses: Vec<f64> = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        gain_sum += gains[i];
        loss_sum += losses[i];
        if i > period {
            gain_sum -= gains[i - period];
            loss_sum -= losses[i - period];
        }

        let valid = i >= period;
        let rsi = if valid {
            let avg_gain = (gain_sum / period as f64).max(0.0);
            let avg_loss = (loss_sum / period as f64).max(0.0);
            rsi_from_averages(avg_gain, avg_loss)
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

// Running sums can leave ~1e-15 residue after a window slides past a move.
const FLAT_EPSILON: f64 = 1e-12;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= FLAT_EPSILON {
        if avg_gain <= FLAT_EPSILON { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                PriceBar::new(
                    "TEST",
                    start + chrono::Duration::days(i as i64),
                    close,
                    close,
                    close,
                    close,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        assert_eq!(series.simple_at(14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        assert_eq!(series.simple_at(14), Some(0.0));
    }

    #[test]
    fn rsi_flat_is_50_not_nan() {
        let series = calculate_rsi(&make_bars(&[100.0; 20]), 14);
        for i in 14..20 {
            assert_eq!(series.simple_at(i), Some(50.0));
        }
    }

    #[test]
    fn rsi_uses_simple_mean_not_wilder() {
        // Changes: +2, -1, +1, +4 with period 3.
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0, 12.0, 16.0]), 3);

        // Index 3 window {+2, -1, +1}: gain 3/3, loss 1/3 → RS 3 → 75
        assert!((series.simple_at(3).unwrap() - 75.0).abs() < 1e-9);
        // Index 4 window {-1, +1, +4}: gain 5/3, loss 1/3 → RS 5 → 83.33
        // (Wilder smoothing would give 90 here.)
        let expected = 100.0 - 100.0 / 6.0;
        assert!((series.simple_at(4).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_sentinel_after_move_leaves_window() {
        let mut prices = vec![100.0; 10];
        prices.push(90.0);
        prices.extend(vec![90.0; 10]);
        let series = calculate_rsi(&make_bars(&prices), 5);

        assert_eq!(series.simple_at(10), Some(0.0));
        assert_eq!(series.simple_at(14), Some(0.0));
        assert_eq!(series.simple_at(15), Some(50.0));
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_bars(&prices), 14);
        for i in 14..40 {
            let rsi = series.simple_at(i).unwrap();
            assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_degenerate_inputs() {
        assert!(calculate_rsi(&[], 14).values.is_empty());
        let one = calculate_rsi(&make_bars(&[100.0]), 14);
        assert_eq!(one.values.len(), 1);
        assert!(!one.values[0].valid);
        let zero = calculate_rsi(&make_bars(&[100.0, 101.0]), 0);
        assert!(zero.values.iter().all(|p| !p.valid));
    }
}
