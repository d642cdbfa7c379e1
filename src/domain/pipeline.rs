//! One report cycle, from loaded histories to ranked rows.
//!
//! Stages: anomaly cross-section, trigger evaluation per instrument,
//! pooled backtests, regime classification, selection, report rows.
//! Everything a stage reads comes from the `RunContext`.

use crate::domain::anomaly::{compute_anomaly_scores, AnomalyScore};
use crate::domain::backtest::{backtest_catalog, BacktestResult, InstrumentTriggers};
use crate::domain::catalog::{catalog, required_indicators, StrategyDefinition};
use crate::domain::config::EngineConfig;
use crate::domain::diversity::DiversityLedger;
use crate::domain::error::EngineError;
use crate::domain::history::{load_histories, snapshot_on, InstrumentHistory};
use crate::domain::regime::{classify, RegimeState};
use crate::domain::report::{build_rows, CycleReport};
use crate::domain::selector::{select, Candidate};
use crate::domain::snapshot::{listing_from, InstrumentSnapshot, Listing};
use crate::ports::data_port::SnapshotPort;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

/// Every instrument's history plus the reference table.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub histories: Vec<InstrumentHistory>,
    pub listing: Listing,
}

impl Universe {
    /// Loads histories for the backtest window and the listing. A missing
    /// listing is not fatal: instruments are then named by their code.
    pub fn load(
        port: &dyn SnapshotPort,
        reference_date: NaiveDate,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let histories =
            load_histories(port, reference_date, config.backtest.lookback_window_days)?;
        let listing = match port.fetch_listing() {
            Ok(infos) => listing_from(infos),
            Err(e) => {
                warn!(error = %e, "listing unavailable, using codes as names");
                Listing::new()
            }
        };
        Ok(Self { histories, listing })
    }

    pub fn history(&self, instrument_id: &str) -> Option<&InstrumentHistory> {
        self.histories
            .iter()
            .find(|h| h.instrument_id == instrument_id)
    }

    pub fn display_name(&self, instrument_id: &str) -> String {
        self.listing
            .get(instrument_id)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| instrument_id.to_string())
    }
}

pub struct RunContext {
    pub reference_date: NaiveDate,
    pub universe: Universe,
    pub config: EngineConfig,
}

impl RunContext {
    pub fn snapshot(&self) -> InstrumentSnapshot {
        snapshot_on(
            &self.universe.histories,
            self.reference_date,
            &self.universe.listing,
        )
    }

    /// Z-scores of the reference-date cross-section. The regime reference
    /// instrument is dropped first, so it never skews the statistics and
    /// never becomes a candidate.
    pub fn anomalies(&self) -> Vec<AnomalyScore> {
        let mut snapshot = self.snapshot();
        if let Some(id) = self.config.data.reference_instrument.as_deref() {
            snapshot.bars.retain(|b| b.instrument_id != id);
        }
        compute_anomaly_scores(&snapshot, &self.universe.listing, &self.config.anomaly)
    }

    /// Classifies the configured reference instrument. Without one, or
    /// without its history, the regime is unknown.
    pub fn regime(&self) -> RegimeState {
        let Some(id) = self.config.data.reference_instrument.as_deref() else {
            warn!("no reference instrument configured, regime unknown");
            return RegimeState::unknown();
        };
        match self.universe.history(id) {
            Some(history) => classify(&history.truncated_to(self.reference_date).bars),
            None => {
                warn!(instrument = id, "reference instrument has no history, regime unknown");
                RegimeState::unknown()
            }
        }
    }

    /// Trigger series of every strategy for every instrument with enough
    /// history. Order follows `universe.histories`.
    pub fn triggers(&self, strategies: &[StrategyDefinition]) -> Vec<InstrumentTriggers> {
        let indicator_types = required_indicators(strategies);
        let evaluated: Vec<Result<InstrumentTriggers, EngineError>> = self
            .universe
            .histories
            .par_iter()
            .map(|h| {
                InstrumentTriggers::evaluate(h, strategies, &indicator_types, self.reference_date)
            })
            .collect();

        let mut triggers = Vec::with_capacity(evaluated.len());
        for result in evaluated {
            match result {
                Ok(t) => triggers.push(t),
                Err(e) => warn!(error = %e, "skipping instrument"),
            }
        }
        triggers
    }

    pub fn backtests(
        &self,
        strategies: &[StrategyDefinition],
        triggers: &[InstrumentTriggers],
    ) -> Vec<BacktestResult> {
        backtest_catalog(strategies, triggers, self.reference_date, &self.config.backtest)
    }
}

/// (instrument, strategy) pairs that fired on the reference date for
/// instruments that survived the anomaly filters.
fn collect_candidates(
    ctx: &RunContext,
    strategies: &[StrategyDefinition],
    triggers: &[InstrumentTriggers],
    backtests: &[BacktestResult],
    anomalies: &[AnomalyScore],
) -> Vec<Candidate> {
    let eligible: HashMap<&str, f64> = anomalies
        .iter()
        .map(|a| (a.instrument_id.as_str(), a.z_score))
        .collect();

    let mut candidates = Vec::new();
    for t in triggers {
        let Some(&anomaly_z) = eligible.get(t.instrument_id.as_str()) else {
            continue;
        };
        let Some(close) = t
            .dates
            .binary_search(&ctx.reference_date)
            .ok()
            .map(|i| t.closes[i])
        else {
            continue;
        };
        for (idx, (strategy, result)) in strategies.iter().zip(backtests).enumerate() {
            if t.fired_on(idx, ctx.reference_date) {
                candidates.push(Candidate {
                    instrument_id: t.instrument_id.clone(),
                    instrument_name: ctx.universe.display_name(&t.instrument_id),
                    close,
                    anomaly_z,
                    result: result.clone(),
                    narrative_template: strategy.narrative_template.clone(),
                });
            }
        }
    }
    candidates
}

/// Runs every stage for `ctx.reference_date` with the full catalog.
pub fn run_cycle(ctx: &RunContext, ledger: &DiversityLedger) -> Result<CycleReport, EngineError> {
    run_cycle_with(ctx, &catalog(), ledger)
}

pub fn run_cycle_with(
    ctx: &RunContext,
    strategies: &[StrategyDefinition],
    ledger: &DiversityLedger,
) -> Result<CycleReport, EngineError> {
    let date = ctx.reference_date;
    let traded_today = ctx
        .universe
        .histories
        .iter()
        .filter(|h| h.get_bar(date).is_some())
        .count();
    if traded_today == 0 {
        return Err(EngineError::NoHistory { date });
    }
    info!(%date, instruments = traded_today, "starting cycle");

    let anomalies = ctx.anomalies();
    let triggers = ctx.triggers(strategies);
    let backtests = ctx.backtests(strategies, &triggers);
    let regime = ctx.regime();
    info!(
        main = %regime.main_regime,
        tactical = %regime.tactical_state,
        evaluated = triggers.len(),
        "regime classified"
    );

    let candidates = collect_candidates(ctx, strategies, &triggers, &backtests, &anomalies);
    info!(candidates = candidates.len(), "strategies triggered");

    let selection = select(candidates, &regime, ledger, &ctx.config.selection);
    let rows = build_rows(&selection, date);

    Ok(CycleReport {
        reference_date: date,
        regime,
        default_persona: selection.default_persona,
        commander: selection.commander,
        overridden: selection.overridden,
        anomalies,
        backtests,
        rows,
    })
}
