//! Rule evaluation against one instrument's bars and precomputed indicators.
//!
//! # Evaluation Semantics
//!
//! Evaluation is three-valued internally: a comparison whose operand cannot
//! be resolved (indicator still warming up, lag reaching before the first
//! bar, missing series) is *undefined* rather than false.
//!
//! - `AND`: false if any child is false, else undefined if any child is undefined
//! - `OR`: true if any child is true, else undefined if any child is undefined
//! - `NOT`: undefined stays undefined
//! - `CROSS_ABOVE`/`CROSS_BELOW`: need the previous bar, undefined at index 0
//! - `CONSECUTIVE(rule, N)`: child true on each of the N bars ending at current
//! - `ANY_OF(rule, N)`: child true at least once in the last N bars
//!
//! The public answer treats undefined as "condition not met".

use crate::domain::indicator::{IndicatorSet, IndicatorValue};
use crate::domain::price_bar::PriceBar;
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule};

/// Whether `rule` fired on `bars[bar_index]`. Undefined resolves to `false`.
pub fn evaluate(rule: &Rule, bars: &[PriceBar], indicators: &IndicatorSet, bar_index: usize) -> bool {
    evaluate_tri(rule, bars, indicators, bar_index).unwrap_or(false)
}

/// One boolean per bar: did the rule fire on that day.
pub fn trigger_series(rule: &Rule, bars: &[PriceBar], indicators: &IndicatorSet) -> Vec<bool> {
    (0..bars.len())
        .map(|i| evaluate(rule, bars, indicators, i))
        .collect()
}

/// `None` means undefined.
pub fn evaluate_tri(
    rule: &Rule,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    bar_index: usize,
) -> Option<bool> {
    let value = |op: &Operand, i: usize| resolve_operand(op, bars, indicators, i);

    match rule {
        Rule::CrossAbove { left, right } => {
            let prev = bar_index.checked_sub(1)?;
            let (lc, rc) = (value(left, bar_index)?, value(right, bar_index)?);
            let (lp, rp) = (value(left, prev)?, value(right, prev)?);
            Some(lc > rc && lp <= rp)
        }
        Rule::CrossBelow { left, right } => {
            let prev = bar_index.checked_sub(1)?;
            let (lc, rc) = (value(left, bar_index)?, value(right, bar_index)?);
            let (lp, rp) = (value(left, prev)?, value(right, prev)?);
            Some(lc < rc && lp >= rp)
        }
        Rule::Above { left, right } => Some(value(left, bar_index)? > value(right, bar_index)?),
        Rule::Below { left, right } => Some(value(left, bar_index)? < value(right, bar_index)?),
        Rule::And(rules) => {
            let mut undefined = false;
            for r in rules {
                match evaluate_tri(r, bars, indicators, bar_index) {
                    Some(false) => return Some(false),
                    None => undefined = true,
                    Some(true) => {}
                }
            }
            if undefined { None } else { Some(true) }
        }
        Rule::Or(rules) => {
            let mut undefined = false;
            for r in rules {
                match evaluate_tri(r, bars, indicators, bar_index) {
                    Some(true) => return Some(true),
                    None => undefined = true,
                    Some(false) => {}
                }
            }
            if undefined { None } else { Some(false) }
        }
        Rule::Not(rule) => evaluate_tri(rule, bars, indicators, bar_index).map(|b| !b),
        Rule::Consecutive { rule, count } => {
            if *count == 0 {
                return None;
            }
            let start = (bar_index + 1).checked_sub(*count)?;
            let mut undefined = false;
            for i in start..=bar_index {
                match evaluate_tri(rule, bars, indicators, i) {
                    Some(false) => return Some(false),
                    None => undefined = true,
                    Some(true) => {}
                }
            }
            if undefined { None } else { Some(true) }
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return None;
            }
            let start = bar_index.saturating_sub(*count - 1);
            let mut undefined = false;
            for i in start..=bar_index {
                match evaluate_tri(rule, bars, indicators, i) {
                    Some(true) => return Some(true),
                    None => undefined = true,
                    Some(false) => {}
                }
            }
            if undefined { None } else { Some(false) }
        }
    }
}

fn resolve_operand(
    operand: &Operand,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    bar_index: usize,
) -> Option<f64> {
    let bar = bars.get(bar_index)?;
    let v = match operand {
        Operand::Open => bar.open,
        Operand::High => bar.high,
        Operand::Low => bar.low,
        Operand::Close => bar.close,
        Operand::Volume => bar.volume,
        Operand::TradingValue => bar.trading_value,
        Operand::Constant(v) => *v,
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators, bar_index)?,
        Operand::Lagged { operand, bars: lag } => {
            resolve_operand(operand, bars, indicators, bar_index.checked_sub(*lag)?)?
        }
        Operand::Scaled { operand, factor } => {
            resolve_operand(operand, bars, indicators, bar_index)? * factor
        }
    };
    v.is_finite().then_some(v)
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &IndicatorSet,
    bar_index: usize,
) -> Option<f64> {
    let point = indicators
        .get(&ind_ref.indicator_type)?
        .values
        .get(bar_index)?;
    if !point.valid {
        return None;
    }
    extract_field(&point.value, ind_ref.field)
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> Option<f64> {
    let v = match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine | IndicatorField::Value) => {
            *line
        }
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => *signal,
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => *histogram,
        (IndicatorValue::Stochastic { k, .. }, IndicatorField::StochasticK | IndicatorField::Value) => {
            *k
        }
        (IndicatorValue::Stochastic { d, .. }, IndicatorField::StochasticD) => *d,
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => *upper,
        (
            IndicatorValue::Bollinger { middle, .. },
            IndicatorField::BollingerMiddle | IndicatorField::Value,
        ) => *middle,
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => *lower,
        (IndicatorValue::Bollinger { width, .. }, IndicatorField::BollingerWidth) => *width,
        _ => return None,
    };
    Some(v)
}
