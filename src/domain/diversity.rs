//! Anti-repetition ledger of previously featured strategies and instruments.

use chrono::NaiveDate;
use serde::Serialize;

/// What one earlier cycle put at the top of its report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub top_strategy: String,
    pub instruments: Vec<String>,
}

/// Prior cycles strictly before the reference date, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiversityLedger {
    entries: Vec<LedgerEntry>,
    weights: Vec<f64>,
}

impl DiversityLedger {
    /// Keeps the `weights.len()` most recent entries dated before
    /// `reference_date`. `weights[0]` applies to the previous cycle,
    /// `weights[1]` to the one before, and so on.
    pub fn from_entries(
        mut entries: Vec<LedgerEntry>,
        reference_date: NaiveDate,
        weights: &[f64],
    ) -> Self {
        entries.retain(|e| e.date < reference_date);
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.dedup_by_key(|e| e.date);
        entries.truncate(weights.len());
        Self {
            entries,
            weights: weights.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Factor for a strategy that led an earlier cycle: the weight of the
    /// most recent matching lag, else 1.
    pub fn strategy_penalty(&self, strategy_name: &str) -> f64 {
        self.first_match(|e| e.top_strategy == strategy_name)
    }

    /// Same decay for an instrument featured on an earlier cycle.
    pub fn instrument_penalty(&self, instrument_id: &str) -> f64 {
        self.first_match(|e| e.instruments.iter().any(|i| i == instrument_id))
    }

    /// Combined factor for one candidate row: the strategy factor times the
    /// instrument factor. Repeating yesterday's top strategy on one of
    /// yesterday's instruments therefore scores `w[0]²` (0.64 with the
    /// default weights).
    pub fn penalty_for(&self, strategy_name: &str, instrument_id: &str) -> f64 {
        self.strategy_penalty(strategy_name) * self.instrument_penalty(instrument_id)
    }

    fn first_match(&self, pred: impl Fn(&LedgerEntry) -> bool) -> f64 {
        self.entries
            .iter()
            .zip(&self.weights)
            .find(|(e, _)| pred(e))
            .map(|(_, w)| *w)
            .unwrap_or(1.0)
    }
}
