//! Signal log port trait.

use crate::domain::diversity::LedgerEntry;
use crate::domain::error::EngineError;

/// Append-only record of past report cycles, read back as the diversity
/// ledger.
pub trait SignalLogPort {
    /// Every recorded entry, in file order. A log that does not exist yet
    /// reads as empty.
    fn read_entries(&self) -> Result<Vec<LedgerEntry>, EngineError>;

    fn append(&self, entry: &LedgerEntry) -> Result<(), EngineError>;
}
