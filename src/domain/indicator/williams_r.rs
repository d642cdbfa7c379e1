//! Williams %R.
//!
//! %R = (HH(n) - C) / (HH(n) - LL(n)) * -100, ranging from -100 to 0.
//! A zero range yields -50.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_williams_r(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::undefined(IndicatorType::WilliamsR(period), bars);
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i + 1 >= period;
            let wr = if valid {
                let window = &bars[i + 1 - period..=i];
                let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                let range = hh - ll;
                if range > 0.0 {
                    (hh - bar.close) / range * -100.0
                } else {
                    -50.0
                }
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Simple(wr),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::WilliamsR(period),
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

    #[test]
    fn williams_r_bounds() {
        let bars = vec![
            make_bar(1, 20.0, 10.0, 15.0),
            make_bar(2, 20.0, 10.0, 20.0),
            make_bar(3, 20.0, 10.0, 10.0),
        ];
        let series = calculate_williams_r(&bars, 2);
        assert!(!series.values[0].valid);
        assert_eq!(series.simple_at(1), Some(0.0));
        assert_eq!(series.simple_at(2), Some(-100.0));
    }

    #[test]
    fn williams_r_zero_range() {
        let bars = vec![make_bar(1, 10.0, 10.0, 10.0), make_bar(2, 10.0, 10.0, 10.0)];
        assert_eq!(calculate_williams_r(&bars, 2).simple_at(1), Some(-50.0));
    }
}
