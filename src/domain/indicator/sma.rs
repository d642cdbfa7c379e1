//! Simple Moving Average over closes, and the same over volume.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i])
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::Sma(period), |b| b.close)
}

pub fn calculate_volume_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::VolumeSma(period), |b| b.volume)
}

fn rolling_mean(
    bars: &[PriceBar],
    period: usize,
    indicator_type: IndicatorType,
    field: impl Fn(&PriceBar) -> f64,
) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::undefined(indicator_type, bars);
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += field(bar);
        if i >= period {
            sum -= field(&bars[i - period]);
        }

        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid { sum / period as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
