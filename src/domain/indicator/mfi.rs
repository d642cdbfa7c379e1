//! Money Flow Index.
//!
//! Raw flow = TP * volume. A bar's flow is positive when its TP rose versus
//! the previous bar, negative when it fell, and ignored when unchanged.
//! MFI = 100 - 100 / (1 + positive_sum / negative_sum) over the last n bars.
//! Sentinels: no negative flow → 100, no flow at all → 50.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_mfi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries::undefined(IndicatorType::Mfi(period), bars);
    }

    let mut positive = vec![0.0; bars.len()];
    let mut negative = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let tp = bars[i].typical_price();
        let prev_tp = bars[i - 1].typical_price();
        let flow = tp * bars[i].volume;
        if tp > prev_tp {
            positive[i] = flow;
        } else if tp < prev_tp {
            negative[i] = flow;
        }
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= period;
            let mfi = if valid {
                let pos: f64 = positive[i + 1 - period..=i].iter().sum();
                let neg: f64 = negative[i + 1 - period..=i].iter().sum();
                if neg > 0.0 {
                    100.0 - 100.0 / (1.0 + pos / neg)
                } else if pos > 0.0 {
                    100.0
                } else {
                    50.0
                }
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Simple(mfi),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Mfi(period),
        values,
    }
}
