//! Configuration validation.
//!
//! `validate_config_file` checks that numeric keys present in the file
//! actually parse, since the port silently falls back to defaults.
//! `validate_engine_config` checks value ranges on the typed config.

use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

/// One hundred years of calendar days.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

const INTEGER_KEYS: &[(&str, &str)] = &[
    ("backtest", "lookback_window_days"),
    ("backtest", "holding_horizon_days"),
    ("backtest", "min_trade_count"),
    ("anomaly", "min_sample_size"),
    ("selection", "top_k"),
];

const FLOAT_KEYS: &[(&str, &str)] = &[
    ("backtest", "low_sample_score_cap"),
    ("anomaly", "liquidity_floor"),
    ("anomaly", "liquidity_percentile"),
    ("selection", "high_confidence_override_threshold"),
];

pub fn validate_config_file(config: &dyn ConfigPort) -> Result<(), EngineError> {
    for (section, key) in INTEGER_KEYS {
        if let Some(raw) = config.get_string(section, key) {
            raw.parse::<i64>()
                .map_err(|_| EngineError::invalid(section, key, format!("'{raw}' is not an integer")))?;
        }
    }
    for (section, key) in FLOAT_KEYS {
        if let Some(raw) = config.get_string(section, key) {
            raw.parse::<f64>()
                .map_err(|_| EngineError::invalid(section, key, format!("'{raw}' is not a number")))?;
        }
    }
    Ok(())
}

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), EngineError> {
    validate_backtest(config)?;
    validate_anomaly(config)?;
    validate_selection(config)?;
    Ok(())
}

fn validate_backtest(config: &EngineConfig) -> Result<(), EngineError> {
    let b = &config.backtest;
    if b.lookback_window_days <= 0 || b.lookback_window_days > MAX_LOOKBACK_DAYS {
        return Err(EngineError::invalid(
            "backtest",
            "lookback_window_days",
            format!("lookback_window_days must be in 1..={MAX_LOOKBACK_DAYS}"),
        ));
    }
    if b.holding_horizon_days == 0 {
        return Err(EngineError::invalid(
            "backtest",
            "holding_horizon_days",
            "holding_horizon_days must be at least 1",
        ));
    }
    if !(1.0..=99.0).contains(&b.low_sample_score_cap) {
        return Err(EngineError::invalid(
            "backtest",
            "low_sample_score_cap",
            "low_sample_score_cap must be between 1 and 99",
        ));
    }
    Ok(())
}

fn validate_anomaly(config: &EngineConfig) -> Result<(), EngineError> {
    let a = &config.anomaly;
    if a.liquidity_floor.is_nan() || a.liquidity_floor < 0.0 {
        return Err(EngineError::invalid(
            "anomaly",
            "liquidity_floor",
            "liquidity_floor must be non-negative",
        ));
    }
    if !(0.0..1.0).contains(&a.liquidity_percentile) {
        return Err(EngineError::invalid(
            "anomaly",
            "liquidity_percentile",
            "liquidity_percentile must be in [0, 1)",
        ));
    }
    if a.min_sample_size < 2 {
        return Err(EngineError::invalid(
            "anomaly",
            "min_sample_size",
            "min_sample_size must be at least 2",
        ));
    }
    Ok(())
}

fn validate_selection(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.selection;
    if !(1.0..=99.0).contains(&s.high_confidence_override_threshold) {
        return Err(EngineError::invalid(
            "selection",
            "high_confidence_override_threshold",
            "threshold must be between 1 and 99",
        ));
    }
    if let Some(w) = s
        .diversity_penalty_weights
        .iter()
        .find(|w| !(**w > 0.0 && **w <= 1.0))
    {
        return Err(EngineError::invalid(
            "selection",
            "diversity_penalty_weights",
            format!("weight {w} must be in (0, 1]"),
        ));
    }
    if s.top_k == 0 {
        return Err(EngineError::invalid("selection", "top_k", "top_k must be at least 1"));
    }
    Ok(())
}
