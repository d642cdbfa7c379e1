//! CSV-backed signal log.
//!
//! One row per report cycle: `date,top_strategy,instruments`, where the
//! featured instruments are joined with `;`.

use crate::domain::diversity::LedgerEntry;
use crate::domain::error::EngineError;
use crate::ports::signal_log_port::SignalLogPort;
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

const HEADER: [&str; 3] = ["date", "top_strategy", "instruments"];
const INSTRUMENT_SEPARATOR: &str = ";";

pub struct CsvSignalLogAdapter {
    path: PathBuf,
}

impl CsvSignalLogAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn log_error(&self, e: impl std::fmt::Display) -> EngineError {
        EngineError::SignalLog {
            reason: format!("{}: {}", self.path.display(), e),
        }
    }
}

impl SignalLogPort for CsvSignalLogAdapter {
    fn read_entries(&self) -> Result<Vec<LedgerEntry>, EngineError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.log_error(e)),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut entries = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.log_error(e))?;
            let raw_date = record.get(0).unwrap_or("");
            let Ok(date) = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") else {
                warn!(path = %self.path.display(), date = raw_date, "skipping log row with bad date");
                continue;
            };
            let instruments = record
                .get(2)
                .unwrap_or("")
                .split(INSTRUMENT_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            entries.push(LedgerEntry {
                date,
                top_strategy: record.get(1).unwrap_or("").to_string(),
                instruments,
            });
        }
        Ok(entries)
    }

    fn append(&self, entry: &LedgerEntry) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.log_error(e))?;
        }
        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.log_error(e))?;

        let mut wtr = csv::Writer::from_writer(file);
        if is_new {
            wtr.write_record(HEADER).map_err(|e| self.log_error(e))?;
        }
        let instruments = entry.instruments.join(INSTRUMENT_SEPARATOR);
        wtr.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            entry.top_strategy.clone(),
            instruments,
        ])
        .map_err(|e| self.log_error(e))?;
        wtr.flush().map_err(|e| self.log_error(e))?;
        Ok(())
    }
}
