//! Per-instrument price history assembled from daily snapshots.

use crate::domain::error::EngineError;
use crate::domain::price_bar::PriceBar;
use crate::domain::snapshot::{InstrumentSnapshot, Listing};
use crate::ports::data_port::SnapshotPort;
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Calendar days loaded ahead of the backtest window so that the slowest
/// lookbacks (MA120 for the regime, MACD/SMA60 for the catalog) are warm by
/// the first day of the window.
pub const HISTORY_WARMUP_DAYS: i64 = 200;

#[derive(Debug, Clone)]
pub struct InstrumentHistory {
    pub instrument_id: String,
    pub bars: Vec<PriceBar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentHistory {
    /// Sorts by date and keeps the first bar seen for any duplicated date.
    pub fn new(instrument_id: String, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            instrument_id,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn last_bar(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Copy of the history with every bar after `date` removed.
    pub fn truncated_to(&self, date: NaiveDate) -> Self {
        let end = self.bars.partition_point(|b| b.date <= date);
        Self::new(self.instrument_id.clone(), self.bars[..end].to_vec())
    }
}

/// `date` minus `days`, saturating at the earliest representable date.
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|d| date.checked_sub_signed(d))
        .unwrap_or(NaiveDate::MIN)
}

/// Rebuilds the cross-section for `date` from per-instrument histories.
pub fn snapshot_on(
    histories: &[InstrumentHistory],
    date: NaiveDate,
    listing: &Listing,
) -> InstrumentSnapshot {
    let bars = histories
        .iter()
        .filter_map(|h| h.get_bar(date).cloned())
        .collect();
    InstrumentSnapshot::new(date, bars, listing)
}

/// Reads every snapshot in `[reference_date - lookback_days - HISTORY_WARMUP_DAYS,
/// reference_date]` and regroups the bars per instrument.
///
/// Unreadable days are skipped with a warning. Snapshots dated after
/// `reference_date` are never requested. Fails only when no bar at all was
/// found.
pub fn load_histories(
    port: &dyn SnapshotPort,
    reference_date: NaiveDate,
    lookback_days: i64,
) -> Result<Vec<InstrumentHistory>, EngineError> {
    let start = days_before(reference_date, lookback_days.saturating_add(HISTORY_WARMUP_DAYS));
    let dates: Vec<NaiveDate> = port
        .available_dates()?
        .into_iter()
        .filter(|d| *d >= start && *d <= reference_date)
        .collect();

    if !dates.contains(&reference_date) {
        warn!(%reference_date, "no snapshot for reference date");
    }

    let mut grouped: BTreeMap<String, Vec<PriceBar>> = BTreeMap::new();
    let mut skipped = 0usize;
    for date in &dates {
        match port.fetch_snapshot(*date) {
            Ok(bars) => {
                for bar in bars.into_iter().filter(|b| b.date == *date) {
                    grouped.entry(bar.instrument_id.clone()).or_default().push(bar);
                }
            }
            Err(e) => {
                warn!(%date, error = %e, "skipping unreadable snapshot");
                skipped += 1;
            }
        }
    }

    if grouped.is_empty() {
        return Err(EngineError::NoHistory {
            date: reference_date,
        });
    }

    info!(
        instruments = grouped.len(),
        days = dates.len() - skipped,
        skipped,
        "loaded price history"
    );

    Ok(grouped
        .into_iter()
        .map(|(id, bars)| InstrumentHistory::new(id, bars))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::InstrumentInfo;
    use std::cell::RefCell;

    fn make_bar(id: &str, date: &str, close: f64) -> PriceBar {
        PriceBar::new(
            id,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            close - 1.0,
            close + 1.0,
            close - 2.0,
            close,
            1000.0,
        )
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct FakePort {
        days: BTreeMap<NaiveDate, Vec<PriceBar>>,
        broken: Vec<NaiveDate>,
        requested: RefCell<Vec<NaiveDate>>,
    }

    impl SnapshotPort for FakePort {
        fn available_dates(&self) -> Result<Vec<NaiveDate>, EngineError> {
            Ok(self.days.keys().copied().collect())
        }

        fn fetch_snapshot(&self, date: NaiveDate) -> Result<Vec<PriceBar>, EngineError> {
            self.requested.borrow_mut().push(date);
            if self.broken.contains(&date) {
                return Err(EngineError::Snapshot {
                    reason: "corrupt".into(),
                });
            }
            Ok(self.days.get(&date).cloned().unwrap_or_default())
        }

        fn fetch_listing(&self) -> Result<Vec<InstrumentInfo>, EngineError> {
            Ok(vec![])
        }
    }

    fn port() -> FakePort {
        let mut days = BTreeMap::new();
        days.insert(
            d("2024-01-01"),
            vec![make_bar("A", "2024-01-01", 10.0), make_bar("B", "2024-01-01", 20.0)],
        );
        days.insert(d("2024-01-02"), vec![make_bar("A", "2024-01-02", 11.0)]);
        days.insert(d("2024-01-03"), vec![make_bar("A", "2024-01-03", 12.0)]);
        days.insert(d("2024-01-04"), vec![make_bar("A", "2024-01-04", 13.0)]);
        FakePort {
            days,
            broken: vec![d("2024-01-02")],
            requested: RefCell::new(vec![]),
        }
    }

    #[test]
    fn history_sorts_and_dedups() {
        let h = InstrumentHistory::new(
            "A".into(),
            vec![
                make_bar("A", "2024-01-03", 3.0),
                make_bar("A", "2024-01-01", 1.0),
                make_bar("A", "2024-01-03", 99.0),
            ],
        );
        assert_eq!(h.bar_count(), 2);
        assert_eq!(h.bars[0].date, d("2024-01-01"));
        assert!((h.get_bar(d("2024-01-03")).unwrap().close - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn truncation_drops_future_bars() {
        let h = InstrumentHistory::new(
            "A".into(),
            vec![
                make_bar("A", "2024-01-01", 1.0),
                make_bar("A", "2024-01-02", 2.0),
                make_bar("A", "2024-01-03", 3.0),
            ],
        );
        let t = h.truncated_to(d("2024-01-02"));
        assert_eq!(t.bar_count(), 2);
        assert!(t.get_bar(d("2024-01-03")).is_none());
        assert_eq!(t.last_bar().unwrap().date, d("2024-01-02"));
    }

    #[test]
    fn load_skips_broken_days_and_never_reads_future() {
        let p = port();
        let histories = load_histories(&p, d("2024-01-03"), 30).unwrap();

        assert_eq!(histories.len(), 2);
        let a = histories.iter().find(|h| h.instrument_id == "A").unwrap();
        assert_eq!(a.bar_count(), 2);
        assert!(a.get_bar(d("2024-01-02")).is_none());
        assert!(!p.requested.borrow().contains(&d("2024-01-04")));
    }

    #[test]
    fn huge_lookback_saturates_instead_of_overflowing() {
        assert_eq!(days_before(d("2024-01-03"), 2), d("2024-01-01"));
        assert_eq!(days_before(d("2024-01-03"), 200_000_000), NaiveDate::MIN);
        assert_eq!(days_before(d("2024-01-03"), i64::MAX), NaiveDate::MIN);

        let p = port();
        let histories = load_histories(&p, d("2024-01-03"), i64::MAX).unwrap();
        assert_eq!(histories.len(), 2);
    }

    #[test]
    fn load_with_no_bars_is_fatal() {
        let p = port();
        let result = load_histories(&p, d("2023-01-01"), 30);
        assert!(matches!(result, Err(EngineError::NoHistory { .. })));
    }

    #[test]
    fn snapshot_on_rebuilds_cross_section() {
        let a = InstrumentHistory::new(
            "A".into(),
            vec![make_bar("A", "2024-01-02", 1.0), make_bar("A", "2024-01-05", 2.0)],
        );
        let b = InstrumentHistory::new("B".into(), vec![make_bar("B", "2024-01-01", 5.0)]);
        let histories = vec![a, b];

        let snap = snapshot_on(&histories, d("2024-01-05"), &Listing::new());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.bars[0].instrument_id, "A");
    }
}
