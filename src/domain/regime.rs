//! Market regime and tactical-state classification.
//!
//! Both axes are recomputed from the reference instrument's bars on every
//! cycle. Nothing is carried over between cycles.

use crate::domain::price_bar::PriceBar;
use serde::Serialize;
use std::fmt;

pub const MAIN_REGIME_PERIOD: usize = 120;
pub const TREND_PERIOD: usize = 20;
pub const VOLATILITY_WINDOW: usize = 5;
pub const MOMENTUM_LAG: usize = 3;

const HIGH_VOLATILITY_MULTIPLIER: f64 = 1.5;
const MOMENTUM_THRESHOLD: f64 = 0.05;
const STRONG_TREND_THRESHOLD: f64 = 0.03;
const SIDEWAYS_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MainRegime {
    Bull,
    Bear,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TacticalState {
    PanicDump,
    FomoPump,
    HighVolChop,
    StrongUptrend,
    StrongDowntrend,
    BoringSideways,
    Grinding,
    /// Fewer bars than the trend average needs.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeState {
    pub main_regime: MainRegime,
    pub tactical_state: TacticalState,
    pub is_high_volatility: bool,
    /// Three-day momentum in percent.
    pub momentum_score: f64,
}

impl RegimeState {
    pub fn unknown() -> Self {
        Self {
            main_regime: MainRegime::Unknown,
            tactical_state: TacticalState::Undetermined,
            is_high_volatility: false,
            momentum_score: 0.0,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn main_regime(bars: &[PriceBar]) -> MainRegime {
    if bars.len() < MAIN_REGIME_PERIOD {
        return MainRegime::Unknown;
    }
    let window = &bars[bars.len() - MAIN_REGIME_PERIOD..];
    let Some(ma) = mean(window.iter().map(|b| b.close)) else {
        return MainRegime::Unknown;
    };
    match bars.last() {
        Some(today) if today.close > ma => MainRegime::Bull,
        Some(_) => MainRegime::Bear,
        None => MainRegime::Unknown,
    }
}

/// Classifies the latest bar of `bars` (ascending by date).
pub fn classify(bars: &[PriceBar]) -> RegimeState {
    let Some(today) = bars.last() else {
        return RegimeState::unknown();
    };
    let n = bars.len();

    // The 5-day average range includes today.
    let is_high_volatility = n >= VOLATILITY_WINDOW
        && mean(bars[n - VOLATILITY_WINDOW..].iter().map(PriceBar::range))
            .is_some_and(|vol| today.range() > HIGH_VOLATILITY_MULTIPLIER * vol);

    let momentum_3d = if n > MOMENTUM_LAG {
        let base = bars[n - 1 - MOMENTUM_LAG].close;
        (today.close - base) / base
    } else {
        0.0
    };

    let trend_power = if n >= TREND_PERIOD {
        mean(bars[n - TREND_PERIOD..].iter().map(|b| b.close))
            .filter(|ma| *ma > 0.0)
            .map(|ma| (today.close - ma) / ma)
    } else {
        None
    };

    let tactical_state = match trend_power {
        None => TacticalState::Undetermined,
        Some(_) if is_high_volatility && momentum_3d < -MOMENTUM_THRESHOLD => {
            TacticalState::PanicDump
        }
        Some(_) if is_high_volatility && momentum_3d > MOMENTUM_THRESHOLD => {
            TacticalState::FomoPump
        }
        Some(_) if is_high_volatility => TacticalState::HighVolChop,
        Some(tp) if tp > STRONG_TREND_THRESHOLD => TacticalState::StrongUptrend,
        Some(tp) if tp < -STRONG_TREND_THRESHOLD => TacticalState::StrongDowntrend,
        Some(tp) if tp.abs() < SIDEWAYS_THRESHOLD => TacticalState::BoringSideways,
        Some(_) => TacticalState::Grinding,
    };

    RegimeState {
        main_regime: main_regime(bars),
        tactical_state,
        is_high_volatility,
        momentum_score: momentum_3d * 100.0,
    }
}

impl fmt::Display for MainRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MainRegime::Bull => "Bull",
            MainRegime::Bear => "Bear",
            MainRegime::Unknown => "Unknown",
        };
        f.pad(s)
    }
}

impl fmt::Display for TacticalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TacticalState::PanicDump => "PanicDump",
            TacticalState::FomoPump => "FOMOPump",
            TacticalState::HighVolChop => "HighVolChop",
            TacticalState::StrongUptrend => "StrongUptrend",
            TacticalState::StrongDowntrend => "StrongDowntrend",
            TacticalState::BoringSideways => "BoringSideways",
            TacticalState::Grinding => "Grinding",
            TacticalState::Undetermined => "Undetermined",
        };
        f.pad(s)
    }
}
