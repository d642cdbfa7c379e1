//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP, n)) / (0.015 * MeanDeviation(TP, n)), TP = (H+L+C)/3.
//! A zero mean deviation yields 0.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::undefined(IndicatorType::Cci(period), bars);
    }

    let tp: Vec<f64> = bars.iter().map(PriceBar::typical_price).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i + 1 >= period;
            let cci = if valid {
                let window = &tp[i + 1 - period..=i];
                let mean = window.iter().sum::<f64>() / period as f64;
                let mean_dev =
                    window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
                if mean_dev > 0.0 {
                    (tp[i] - mean) / (LAMBERT_CONSTANT * mean_dev)
                } else {
                    0.0
                }
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Simple(cci),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Cci(period),
        values,
    }
}
