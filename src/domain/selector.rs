//! Regime-aware strategy selection with diversity penalty.
//!
//! 1. The tactical state implies a default persona.
//! 2. The best raw-scoring candidate may promote its own category's persona
//!    to commander when its score clears the override threshold.
//! 3. Scores are multiplied by the ledger's decay factors, then re-ranked.
//! 4. One row per instrument, top K.

use crate::domain::backtest::BacktestResult;
use crate::domain::catalog::StrategyCategory;
use crate::domain::diversity::DiversityLedger;
use crate::domain::regime::{RegimeState, TacticalState};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Persona {
    ContrarianBuyer,
    TrendFollower,
    BreakoutTimer,
    Accumulator,
    Defensive,
}

impl Persona {
    pub fn for_tactical(state: TacticalState) -> Self {
        match state {
            TacticalState::PanicDump => Persona::ContrarianBuyer,
            TacticalState::StrongUptrend | TacticalState::FomoPump => Persona::TrendFollower,
            TacticalState::HighVolChop => Persona::BreakoutTimer,
            TacticalState::BoringSideways | TacticalState::Grinding => Persona::Accumulator,
            TacticalState::StrongDowntrend | TacticalState::Undetermined => Persona::Defensive,
        }
    }

    pub fn for_category(category: StrategyCategory) -> Self {
        match category {
            StrategyCategory::Reversal => Persona::ContrarianBuyer,
            StrategyCategory::Trend => Persona::TrendFollower,
            StrategyCategory::Momentum => Persona::BreakoutTimer,
            StrategyCategory::Breakdown => Persona::Defensive,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Persona::ContrarianBuyer => "contrarian buyer",
            Persona::TrendFollower => "trend follower",
            Persona::BreakoutTimer => "breakout timer",
            Persona::Accumulator => "accumulator",
            Persona::Defensive => "defensive",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub high_confidence_override_threshold: f64,
    /// Lag-1, lag-2, ... decay factors.
    pub diversity_penalty_weights: Vec<f64>,
    pub top_k: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            high_confidence_override_threshold: 80.0,
            diversity_penalty_weights: vec![0.8, 0.9],
            top_k: 5,
        }
    }
}

/// A strategy that fired on the reference date for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub instrument_id: String,
    pub instrument_name: String,
    pub close: f64,
    pub anomaly_z: f64,
    pub result: BacktestResult,
    pub narrative_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub persona: Persona,
    pub penalty: f64,
    pub penalized_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub default_persona: Persona,
    pub commander: Persona,
    pub overridden: bool,
    pub highest_score: Option<f64>,
    pub ranked: Vec<RankedCandidate>,
}

/// Higher score first, then larger anomaly, then code and strategy name.
fn rank_order(a_score: f64, a: &Candidate, b_score: f64, b: &Candidate) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.anomaly_z.total_cmp(&a.anomaly_z))
        .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        .then_with(|| a.result.strategy_name.cmp(&b.result.strategy_name))
}

pub fn select(
    candidates: Vec<Candidate>,
    regime: &RegimeState,
    ledger: &DiversityLedger,
    config: &SelectionConfig,
) -> Selection {
    let default_persona = Persona::for_tactical(regime.tactical_state);

    let mut pool: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.result.trade_count > 0)
        .collect();
    if pool.iter().any(|c| c.result.reliable) {
        pool.retain(|c| c.result.reliable);
    }

    let best = pool
        .iter()
        .min_by(|a, b| rank_order(a.result.score, a, b.result.score, b));
    let highest_score = best.map(|c| c.result.score);

    let (commander, overridden) = match best {
        Some(c) => {
            let persona = Persona::for_category(c.result.category);
            if persona != default_persona
                && c.result.score >= config.high_confidence_override_threshold
            {
                (persona, true)
            } else {
                (default_persona, false)
            }
        }
        None => (default_persona, false),
    };

    let mut ranked: Vec<RankedCandidate> = pool
        .into_iter()
        .map(|c| {
            let penalty = ledger.penalty_for(&c.result.strategy_name, &c.instrument_id);
            RankedCandidate {
                persona: Persona::for_category(c.result.category),
                penalty,
                penalized_score: c.result.score * penalty,
                candidate: c,
            }
        })
        .collect();
    ranked.sort_by(|a, b| rank_order(a.penalized_score, &a.candidate, b.penalized_score, &b.candidate));

    let mut seen = HashSet::new();
    ranked.retain(|r| seen.insert(r.candidate.instrument_id.clone()));
    ranked.truncate(config.top_k);

    info!(
        %default_persona,
        %commander,
        overridden,
        rows = ranked.len(),
        "strategy selection complete"
    );

    Selection {
        default_persona,
        commander,
        overridden,
        highest_score,
        ranked,
    }
}
