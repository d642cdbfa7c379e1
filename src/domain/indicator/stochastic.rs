//! Stochastic oscillator %K / %D.
//!
//! %K[i] = (C[i] - LL(k)) / (HH(k) - LL(k)) * 100, 50 when HH == LL
//! %D[i] = SMA(d) of %K
//! Warmup: (k-1) + (d-1) bars.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries::undefined(indicator_type, bars);
    }

    let k_warmup = k_period - 1;
    let warmup = k_warmup + d_period - 1;

    let k_values: Vec<f64> = (0..bars.len())
        .map(|i| {
            if i < k_warmup {
                return 0.0;
            }
            let window = &bars[i + 1 - k_period..=i];
            let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let range = hh - ll;
            if range > 0.0 {
                (bars[i].close - ll) / range * 100.0
            } else {
                50.0
            }
        })
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= warmup;
            let (k, d) = if valid {
                let d = k_values[i + 1 - d_period..=i].iter().sum::<f64>() / d_period as f64;
                (k_values[i], d)
            } else {
                (0.0, 0.0)
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Stochastic { k, d },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar::new(
            "TEST",
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            high,
            low,
            close,
            1000.0,
        )
    }

    fn kd(series: &IndicatorSeries, i: usize) -> (f64, f64) {
        match series.values[i].value {
            IndicatorValue::Stochastic { k, d } => (k, d),
            _ => panic!("Expected Stochastic value"),
        }
    }

    #[test]
    fn stochastic_close_at_high_is_100() {
        let bars = vec![
            make_bar(1, 10.0, 5.0, 6.0),
            make_bar(2, 12.0, 6.0, 12.0),
            make_bar(3, 14.0, 8.0, 14.0),
            make_bar(4, 16.0, 10.0, 16.0),
        ];
        let series = calculate_stochastic(&bars, 2, 2);

        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        let (k, d) = kd(&series, 3);
        assert!((k - 100.0).abs() < 1e-9);
        assert!((d - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_known_values() {
        let bars = vec![
            make_bar(1, 10.0, 0.0, 5.0),
            make_bar(2, 10.0, 0.0, 2.0),
            make_bar(3, 10.0, 0.0, 8.0),
        ];
        let series = calculate_stochastic(&bars, 1, 3);
        // %K = 50, 20, 80 → %D at index 2 = 50
        let (k, d) = kd(&series, 2);
        assert!((k - 80.0).abs() < 1e-9);
        assert!((d - 50.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_flat_range_is_50() {
        let bars: Vec<PriceBar> = (1..=5).map(|d| make_bar(d, 10.0, 10.0, 10.0)).collect();
        let series = calculate_stochastic(&bars, 3, 2);
        let (k, d) = kd(&series, 4);
        assert_eq!((k, d), (50.0, 50.0));
    }

    #[test]
    fn stochastic_zero_period() {
        let bars = vec![make_bar(1, 10.0, 5.0, 6.0)];
        let series = calculate_stochastic(&bars, 0, 3);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }
}
