//! CSV report adapter implementing ReportPort.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::report::SignalRow;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub struct CsvReportAdapter;

fn write_csv<T: Serialize>(records: &[T], output_path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let report_error = |e: csv::Error| {
        EngineError::Io(std::io::Error::other(format!(
            "failed to write {}: {}",
            output_path.display(),
            e
        )))
    };
    let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
    for record in records {
        wtr.serialize(record).map_err(report_error)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_signals(&self, rows: &[SignalRow], output_path: &Path) -> Result<(), EngineError> {
        write_csv(rows, output_path)
    }

    fn write_backtests(
        &self,
        results: &[BacktestResult],
        output_path: &Path,
    ) -> Result<(), EngineError> {
        write_csv(results, output_path)
    }
}
