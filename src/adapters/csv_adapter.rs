//! CSV snapshot directory adapter.
//!
//! Layout: one file per trade date named `YYYY-MM-DD.csv` inside the
//! snapshot directory, plus a separate listing CSV. Columns are located by
//! header name, so their order does not matter.

use crate::domain::error::EngineError;
use crate::domain::price_bar::PriceBar;
use crate::domain::snapshot::{InstrumentInfo, SizeBucket};
use crate::ports::data_port::SnapshotPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvSnapshotAdapter {
    snapshot_dir: PathBuf,
    listing_path: PathBuf,
}

impl CsvSnapshotAdapter {
    pub fn new(snapshot_dir: PathBuf, listing_path: PathBuf) -> Self {
        Self {
            snapshot_dir,
            listing_path,
        }
    }

    fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.snapshot_dir
            .join(format!("{}.csv", date.format(DATE_FORMAT)))
    }
}

fn snapshot_error(path: &Path, e: impl std::fmt::Display) -> EngineError {
    EngineError::Snapshot {
        reason: format!("{}: {}", path.display(), e),
    }
}

/// Column positions resolved from a header row.
struct Columns {
    code: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    trading_value: Option<usize>,
    market_cap: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self, EngineError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| snapshot_error(path, format!("missing column '{name}'")))
        };
        Ok(Self {
            code: require("code")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            trading_value: find("trading_value"),
            market_cap: find("market_cap"),
        })
    }

    fn parse_row(&self, record: &StringRecord, date: NaiveDate) -> Result<PriceBar, String> {
        let field = |idx: usize, name: &str| -> Result<f64, String> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>()
                .map_err(|_| format!("invalid {name} value '{raw}'"))
        };
        let optional = |idx: Option<usize>| -> Option<f64> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok())
        };

        let code = record.get(self.code).unwrap_or("").trim();
        if code.is_empty() {
            return Err("empty code".to_string());
        }

        let mut bar = PriceBar::new(
            code,
            date,
            field(self.open, "open")?,
            field(self.high, "high")?,
            field(self.low, "low")?,
            field(self.close, "close")?,
            field(self.volume, "volume")?,
        );
        if let Some(tv) = optional(self.trading_value) {
            bar.trading_value = tv;
        }
        bar.market_cap = optional(self.market_cap);
        Ok(bar)
    }
}

impl SnapshotPort for CsvSnapshotAdapter {
    fn available_dates(&self) -> Result<Vec<NaiveDate>, EngineError> {
        let entries =
            fs::read_dir(&self.snapshot_dir).map_err(|e| snapshot_error(&self.snapshot_dir, e))?;

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| snapshot_error(&self.snapshot_dir, e))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".csv")) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Vec<PriceBar>, EngineError> {
        let path = self.snapshot_path(date);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::DataGap {
            date,
            reason: format!("{}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| snapshot_error(&path, e))?.clone();
        let columns = Columns::resolve(&headers, &path)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| snapshot_error(&path, e))?;
            match columns.parse_row(&record, date) {
                Ok(bar) if bar.is_well_formed() => bars.push(bar),
                Ok(bar) => {
                    warn!(%date, code = %bar.instrument_id, "dropping malformed bar")
                }
                Err(reason) => warn!(%date, row = line + 2, %reason, "dropping unreadable row"),
            }
        }
        Ok(bars)
    }

    fn fetch_listing(&self) -> Result<Vec<InstrumentInfo>, EngineError> {
        let path = &self.listing_path;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| snapshot_error(path, e))?;
        let headers = rdr.headers().map_err(|e| snapshot_error(path, e))?.clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let code_col = find("code").ok_or_else(|| snapshot_error(path, "missing column 'code'"))?;
        let name_col = find("name");
        let bucket_col = find("size_bucket");
        let class_col = find("classification");

        let mut infos = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| snapshot_error(path, e))?;
            let get = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("");
            let code = get(Some(code_col));
            if code.is_empty() {
                continue;
            }
            let raw_bucket = get(bucket_col);
            let size_bucket = raw_bucket.parse::<SizeBucket>().unwrap_or_else(|e| {
                warn!(%code, error = %e, "treating size bucket as unknown");
                SizeBucket::Unknown
            });
            let name = get(name_col);
            infos.push(InstrumentInfo {
                instrument_id: code.to_string(),
                name: if name.is_empty() { code } else { name }.to_string(),
                size_bucket,
                classification: get(class_col).to_string(),
            });
        }
        Ok(infos)
    }
}
