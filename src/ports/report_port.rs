//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::report::SignalRow;
use std::path::Path;

/// Port for writing a cycle's tabular output.
pub trait ReportPort {
    fn write_signals(&self, rows: &[SignalRow], output_path: &Path) -> Result<(), EngineError>;

    fn write_backtests(
        &self,
        results: &[BacktestResult],
        output_path: &Path,
    ) -> Result<(), EngineError>;
}
