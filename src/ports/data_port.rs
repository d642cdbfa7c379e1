//! Snapshot access port trait.

use crate::domain::error::EngineError;
use crate::domain::price_bar::PriceBar;
use crate::domain::snapshot::InstrumentInfo;
use chrono::NaiveDate;

/// Read-only access to pre-fetched daily snapshots.
///
/// Implementations resolve exactly one snapshot per date. Falling back to
/// another source is the collector's job, not the port's.
pub trait SnapshotPort {
    /// Trade dates for which a snapshot exists, ascending.
    fn available_dates(&self) -> Result<Vec<NaiveDate>, EngineError>;

    /// All well-formed bars recorded for `date`.
    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Vec<PriceBar>, EngineError>;

    fn fetch_listing(&self) -> Result<Vec<InstrumentInfo>, EngineError>;
}
