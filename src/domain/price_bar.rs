//! Daily price bar representation.

use chrono::NaiveDate;
use serde::Serialize;

/// One instrument's trading day. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Turnover for the day. Falls back to `close * volume` when the source
    /// has no turnover column.
    pub trading_value: f64,
    pub market_cap: Option<f64>,
}

impl PriceBar {
    /// Builds a bar whose trading value is approximated as `close * volume`.
    pub fn new(
        instrument_id: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            date,
            open,
            high,
            low,
            close,
            volume,
            trading_value: close * volume,
            market_cap: None,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Bars with a non-positive close, negative volume or non-finite prices
    /// are dropped at ingestion.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.close > 0.0
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.trading_value.is_finite()
            && self.trading_value >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar::new(
            "005930",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            100.0,
            110.0,
            90.0,
            105.0,
            50_000.0,
        )
    }

    #[test]
    fn trading_value_defaults_to_close_times_volume() {
        let bar = sample_bar();
        assert!((bar.trading_value - 5_250_000.0).abs() < f64::EPSILON);
        assert!(bar.market_cap.is_none());
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
        assert!((bar.range() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn well_formed_rejects_bad_bars() {
        assert!(sample_bar().is_well_formed());

        let mut zero_close = sample_bar();
        zero_close.close = 0.0;
        assert!(!zero_close.is_well_formed());

        let mut negative_volume = sample_bar();
        negative_volume.volume = -1.0;
        assert!(!negative_volume.is_well_formed());

        let mut nan_high = sample_bar();
        nan_high.high = f64::NAN;
        assert!(!nan_high.is_well_formed());
    }
}
