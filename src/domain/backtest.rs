//! Walk-forward backtest of catalog strategies.
//!
//! Every strategy condition is evaluated once per instrument over its full
//! history (truncated at the reference date). A trigger day `t` becomes a
//! trade only when its exit bar `t + h` is already observable, so the
//! reference day itself never contributes a trade to its own score.

use crate::domain::catalog::{PositionSide, StrategyCategory, StrategyDefinition};
use crate::domain::error::EngineError;
use crate::domain::history::{days_before, InstrumentHistory};
use crate::domain::indicator::{compute_indicators, IndicatorType};
use crate::domain::rule_eval::trigger_series;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 99.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Trailing calendar days whose trigger days count as trades.
    pub lookback_window_days: i64,
    /// Horizon for strategies that do not carry their own.
    pub holding_horizon_days: usize,
    pub min_trade_count: usize,
    pub low_sample_score_cap: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookback_window_days: 365,
            holding_horizon_days: 3,
            min_trade_count: 3,
            low_sample_score_cap: 40.0,
        }
    }
}

/// Trigger days of every strategy for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentTriggers {
    pub instrument_id: String,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    /// `fired[s][t]`: strategy `s` fired on bar `t`.
    pub fired: Vec<Vec<bool>>,
}

impl InstrumentTriggers {
    /// Evaluates `strategies` over the history up to and including
    /// `reference_date`. Bars after it are dropped before anything is read.
    ///
    /// Fails with `InsufficientHistory` when no strategy could possibly be
    /// defined on the available bars.
    pub fn evaluate(
        history: &InstrumentHistory,
        strategies: &[StrategyDefinition],
        indicator_types: &HashSet<IndicatorType>,
        reference_date: NaiveDate,
    ) -> Result<Self, EngineError> {
        let history = history.truncated_to(reference_date);
        let minimum = strategies
            .iter()
            .map(StrategyDefinition::min_bars)
            .min()
            .unwrap_or(1);
        let bars = history.bar_count();
        if bars < minimum {
            return Err(EngineError::InsufficientHistory {
                instrument: history.instrument_id,
                bars,
                minimum,
            });
        }

        let indicators = compute_indicators(&history.bars, indicator_types);
        let fired = strategies
            .iter()
            .map(|s| trigger_series(&s.condition, &history.bars, &indicators))
            .collect();

        Ok(Self {
            dates: history.bars.iter().map(|b| b.date).collect(),
            closes: history.bars.iter().map(|b| b.close).collect(),
            instrument_id: history.instrument_id,
            fired,
        })
    }

    /// Whether strategy `strategy_idx` fired on exactly `date`.
    pub fn fired_on(&self, strategy_idx: usize, date: NaiveDate) -> bool {
        match self.dates.binary_search(&date) {
            Ok(t) => self
                .fired
                .get(strategy_idx)
                .and_then(|f| f.get(t))
                .copied()
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Realized percentage returns of every observable trade of one strategy.
    pub fn trade_returns(
        &self,
        strategy_idx: usize,
        side: PositionSide,
        holding: usize,
        window_start: NaiveDate,
        reference_date: NaiveDate,
    ) -> Vec<f64> {
        let Some(fired) = self.fired.get(strategy_idx) else {
            return Vec::new();
        };
        let observable = self.dates.partition_point(|d| *d <= reference_date);
        if holding == 0 || observable <= holding {
            return Vec::new();
        }
        let last = observable - 1;

        (0..=last - holding)
            .filter(|&t| fired[t] && self.dates[t] >= window_start)
            .map(|t| {
                let entry = self.closes[t];
                let raw = (self.closes[t + holding] - entry) / entry * 100.0;
                match side {
                    PositionSide::Long => raw,
                    PositionSide::Short => -raw,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub category: StrategyCategory,
    pub side: PositionSide,
    pub holding_days: usize,
    pub win_rate: f64,
    pub avg_return_pct: f64,
    pub trade_count: usize,
    pub score: f64,
    /// `false` when fewer than `min_trade_count` trades back the score.
    pub reliable: bool,
}

/// `50 + (win_rate - 50) + avg_return * 3`, clamped to `[1, 99]`.
pub fn score(win_rate: f64, avg_return_pct: f64) -> f64 {
    (50.0 + (win_rate - 50.0) + avg_return_pct * 3.0).clamp(MIN_SCORE, MAX_SCORE)
}

/// Aggregates trade returns into a result.
pub fn summarize(
    strategy: &StrategyDefinition,
    holding_days: usize,
    returns: &[f64],
    config: &BacktestConfig,
) -> BacktestResult {
    let trade_count = returns.len();
    let (win_rate, avg_return_pct, raw_score) = if trade_count == 0 {
        (0.0, 0.0, MIN_SCORE)
    } else {
        let wins = returns.iter().filter(|r| **r > 0.0).count();
        let win_rate = wins as f64 / trade_count as f64 * 100.0;
        let avg = returns.iter().sum::<f64>() / trade_count as f64;
        (win_rate, avg, score(win_rate, avg))
    };

    let reliable = trade_count >= config.min_trade_count && trade_count > 0;
    let score = if reliable {
        raw_score
    } else {
        raw_score.min(config.low_sample_score_cap)
    };

    BacktestResult {
        strategy_name: strategy.name.clone(),
        category: strategy.category,
        side: strategy.side,
        holding_days,
        win_rate,
        avg_return_pct,
        trade_count,
        score,
        reliable,
    }
}

/// Backtest of one strategy pooled across every instrument.
pub fn backtest_strategy(
    strategy_idx: usize,
    strategy: &StrategyDefinition,
    triggers: &[InstrumentTriggers],
    reference_date: NaiveDate,
    config: &BacktestConfig,
) -> BacktestResult {
    let holding = strategy.holding_or(config.holding_horizon_days);
    let window_start = days_before(reference_date, config.lookback_window_days);

    let returns: Vec<f64> = triggers
        .iter()
        .flat_map(|t| {
            t.trade_returns(strategy_idx, strategy.side, holding, window_start, reference_date)
        })
        .collect();

    let result = summarize(strategy, holding, &returns, config);
    debug!(
        strategy = %result.strategy_name,
        trades = result.trade_count,
        win_rate = result.win_rate,
        avg_return = result.avg_return_pct,
        score = result.score,
        "backtested"
    );
    result
}

/// Backtests every strategy in parallel. Output order follows `strategies`.
pub fn backtest_catalog(
    strategies: &[StrategyDefinition],
    triggers: &[InstrumentTriggers],
    reference_date: NaiveDate,
    config: &BacktestConfig,
) -> Vec<BacktestResult> {
    strategies
        .par_iter()
        .enumerate()
        .map(|(i, s)| backtest_strategy(i, s, triggers, reference_date, config))
        .collect()
}
