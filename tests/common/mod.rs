#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use signaldesk::domain::error::EngineError;
use signaldesk::domain::history::InstrumentHistory;
pub use signaldesk::domain::price_bar::PriceBar;
use signaldesk::domain::snapshot::{InstrumentInfo, SizeBucket};
use signaldesk::ports::data_port::SnapshotPort;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// In-memory snapshot store keyed by trade date.
pub struct MockSnapshotPort {
    pub days: BTreeMap<NaiveDate, Vec<PriceBar>>,
    pub listing: Vec<InstrumentInfo>,
    pub broken: HashSet<NaiveDate>,
}

impl MockSnapshotPort {
    pub fn new() -> Self {
        Self {
            days: BTreeMap::new(),
            listing: Vec::new(),
            broken: HashSet::new(),
        }
    }

    pub fn with_bars(mut self, bars: Vec<PriceBar>) -> Self {
        for bar in bars {
            self.days.entry(bar.date).or_default().push(bar);
        }
        self
    }

    pub fn with_listing(mut self, code: &str, name: &str, bucket: SizeBucket) -> Self {
        self.listing.push(InstrumentInfo {
            instrument_id: code.to_string(),
            name: name.to_string(),
            size_bucket: bucket,
            classification: String::new(),
        });
        self
    }

    pub fn with_broken_day(mut self, date: NaiveDate) -> Self {
        self.broken.insert(date);
        self
    }
}

impl SnapshotPort for MockSnapshotPort {
    fn available_dates(&self) -> Result<Vec<NaiveDate>, EngineError> {
        Ok(self.days.keys().copied().collect())
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Vec<PriceBar>, EngineError> {
        if self.broken.contains(&date) {
            return Err(EngineError::Snapshot {
                reason: format!("corrupt file for {date}"),
            });
        }
        self.days
            .get(&date)
            .cloned()
            .ok_or_else(|| EngineError::DataGap {
                date,
                reason: "no file".to_string(),
            })
    }

    fn fetch_listing(&self) -> Result<Vec<InstrumentInfo>, EngineError> {
        Ok(self.listing.clone())
    }
}

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn day(offset: usize) -> NaiveDate {
    start() + Duration::days(offset as i64)
}

/// Bar with open == high == low == close.
pub fn flat_bar(code: &str, offset: usize, close: f64, volume: f64) -> PriceBar {
    PriceBar::new(code, day(offset), close, close, close, close, volume)
}

/// One bar per close, on consecutive days from `start()`.
pub fn bars_from_closes(code: &str, closes: &[f64], volume: f64) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_bar(code, i, c, volume))
        .collect()
}

/// Bars with a 1% range around each close and a gently rising close.
pub fn wavy_bars(code: &str, days: usize, base: f64, volume: f64) -> Vec<PriceBar> {
    (0..days)
        .map(|i| {
            let close = base * (1.0 + 0.002 * i as f64 + 0.03 * (i as f64 / 6.0).sin());
            PriceBar::new(
                code,
                day(i),
                close * 0.998,
                close * 1.005,
                close * 0.995,
                close,
                volume * (1.0 + 0.2 * (i as f64 / 4.0).cos().abs()),
            )
        })
        .collect()
}

pub fn history(code: &str, bars: Vec<PriceBar>) -> InstrumentHistory {
    InstrumentHistory::new(code.to_string(), bars)
}

/// 300 closes: flat at 100, one drop to 90 on day 150, a recovery to 93.6
/// by day 153, then flat again.
pub fn panic_dip_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 150];
    closes.extend([90.0, 91.2, 92.4, 93.6]);
    closes.resize(300, 93.6);
    closes
}

/// Writes one CSV per day into `dir` in the snapshot layout.
pub fn write_snapshot_dir(dir: &Path, bars: &[PriceBar]) {
    let mut by_day: BTreeMap<NaiveDate, Vec<&PriceBar>> = BTreeMap::new();
    for bar in bars {
        by_day.entry(bar.date).or_default().push(bar);
    }
    for (date, day_bars) in by_day {
        let mut content = String::from("code,open,high,low,close,volume\n");
        for b in day_bars {
            content.push_str(&format!(
                "{},{},{},{},{},{}\n",
                b.instrument_id, b.open, b.high, b.low, b.close, b.volume
            ));
        }
        fs::write(dir.join(format!("{}.csv", date.format("%Y-%m-%d"))), content).unwrap();
    }
}
