//! Final signal rows and the per-cycle report.

use crate::domain::anomaly::AnomalyScore;
use crate::domain::backtest::BacktestResult;
use crate::domain::catalog::PositionSide;
use crate::domain::diversity::LedgerEntry;
use crate::domain::regime::RegimeState;
use crate::domain::selector::{Persona, RankedCandidate, Selection};
use chrono::NaiveDate;
use serde::Serialize;

pub const NEUTRAL_SCORE: f64 = 50.0;
pub const NO_SIGNAL_STRATEGY: &str = "No Signal";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub rank: usize,
    pub instrument_name: String,
    pub code: String,
    pub close: f64,
    pub anomaly_sigma: f64,
    pub sentiment_label: String,
    pub strategy_name: String,
    pub score: f64,
    pub narrative: String,
}

pub fn sentiment_label(side: Option<PositionSide>) -> &'static str {
    match side {
        Some(PositionSide::Long) => "Bullish",
        Some(PositionSide::Short) => "Bearish",
        None => "Neutral",
    }
}

/// Fills `{name}`, `{instrument}`, `{win_rate}`, `{avg_return}`, `{trades}`,
/// `{holding}`, `{score}` and `{persona}` in `template`.
pub fn render_narrative(template: &str, ranked: &RankedCandidate, persona: Persona) -> String {
    let c = &ranked.candidate;
    let r = &c.result;
    [
        ("{name}", r.strategy_name.clone()),
        ("{instrument}", c.instrument_name.clone()),
        ("{win_rate}", format!("{:.0}", r.win_rate)),
        ("{avg_return}", format!("{:+.2}", r.avg_return_pct)),
        ("{trades}", r.trade_count.to_string()),
        ("{holding}", r.holding_days.to_string()),
        ("{score}", format!("{:.0}", ranked.penalized_score)),
        ("{persona}", persona.to_string()),
    ]
    .iter()
    .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
}

/// The single row emitted when nothing fired.
pub fn neutral_row(reference_date: NaiveDate) -> SignalRow {
    SignalRow {
        rank: 1,
        instrument_name: "-".to_string(),
        code: "-".to_string(),
        close: 0.0,
        anomaly_sigma: 0.0,
        sentiment_label: sentiment_label(None).to_string(),
        strategy_name: NO_SIGNAL_STRATEGY.to_string(),
        score: NEUTRAL_SCORE,
        narrative: format!("No strategy fired on {reference_date}. Wait and see."),
    }
}

pub fn build_rows(selection: &Selection, reference_date: NaiveDate) -> Vec<SignalRow> {
    if selection.ranked.is_empty() {
        return vec![neutral_row(reference_date)];
    }
    selection
        .ranked
        .iter()
        .enumerate()
        .map(|(i, ranked)| {
            let c = &ranked.candidate;
            SignalRow {
                rank: i + 1,
                instrument_name: c.instrument_name.clone(),
                code: c.instrument_id.clone(),
                close: c.close,
                anomaly_sigma: c.anomaly_z,
                sentiment_label: sentiment_label(Some(c.result.side)).to_string(),
                strategy_name: c.result.strategy_name.clone(),
                score: ranked.penalized_score,
                narrative: render_narrative(&c.narrative_template, ranked, selection.commander),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub reference_date: NaiveDate,
    pub regime: RegimeState,
    pub default_persona: Persona,
    pub commander: Persona,
    pub overridden: bool,
    pub anomalies: Vec<AnomalyScore>,
    pub backtests: Vec<BacktestResult>,
    pub rows: Vec<SignalRow>,
}

impl CycleReport {
    pub fn is_neutral(&self) -> bool {
        self.rows.iter().all(|r| r.strategy_name == NO_SIGNAL_STRATEGY)
    }

    /// What this cycle contributes to future diversity lookups.
    pub fn ledger_entry(&self) -> Option<LedgerEntry> {
        if self.is_neutral() {
            return None;
        }
        let top = self.rows.first()?;
        Some(LedgerEntry {
            date: self.reference_date,
            top_strategy: top.strategy_name.clone(),
            instruments: self.rows.iter().map(|r| r.code.clone()).collect(),
        })
    }
}
