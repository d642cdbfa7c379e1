//! Technical indicator implementations.
//!
//! Every indicator returns an [`IndicatorSeries`] aligned one-to-one with the
//! input bars. Points inside the warm-up window carry `valid == false` and a
//! placeholder value that must never be read. Ratio indicators resolve a zero
//! denominator to a documented sentinel instead of producing NaN.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod williams_r;

pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use cci::calculate_cci;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use mfi::calculate_mfi;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_sma};
pub use stochastic::calculate_stochastic;
pub use williams_r::calculate_williams_r;

use crate::domain::price_bar::PriceBar;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
        /// (upper - lower) / middle
        width: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    VolumeSma(usize),
    Rsi(usize),
    Atr(usize),
    Cci(usize),
    Mfi(usize),
    WilliamsR(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Number of leading bars whose value is undefined.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Sma(n)
            | IndicatorType::Ema(n)
            | IndicatorType::VolumeSma(n)
            | IndicatorType::Atr(n)
            | IndicatorType::Cci(n)
            | IndicatorType::WilliamsR(n) => n.saturating_sub(1),
            IndicatorType::Rsi(n) | IndicatorType::Mfi(n) => *n,
            IndicatorType::Macd { slow, signal, .. } => {
                slow.saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                k_period.saturating_sub(1) + d_period.saturating_sub(1)
            }
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Series of the right length with every point invalid.
    pub fn undefined(indicator_type: IndicatorType, bars: &[PriceBar]) -> Self {
        let placeholder = match indicator_type {
            IndicatorType::Macd { .. } => IndicatorValue::Macd {
                line: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
            IndicatorType::Stochastic { .. } => IndicatorValue::Stochastic { k: 0.0, d: 0.0 },
            IndicatorType::Bollinger { .. } => IndicatorValue::Bollinger {
                upper: 0.0,
                middle: 0.0,
                lower: 0.0,
                width: 0.0,
            },
            _ => IndicatorValue::Simple(0.0),
        };
        Self {
            indicator_type,
            values: bars
                .iter()
                .map(|b| IndicatorPoint {
                    date: b.date,
                    valid: false,
                    value: placeholder.clone(),
                })
                .collect(),
        }
    }

    /// The scalar value at `index`, or `None` when out of range, inside
    /// warm-up, or not a scalar indicator.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }
}

pub type IndicatorSet = HashMap<IndicatorType, IndicatorSeries>;

pub fn calculate(bars: &[PriceBar], indicator_type: &IndicatorType) -> IndicatorSeries {
    match *indicator_type {
        IndicatorType::Sma(n) => calculate_sma(bars, n),
        IndicatorType::Ema(n) => calculate_ema(bars, n),
        IndicatorType::VolumeSma(n) => calculate_volume_sma(bars, n),
        IndicatorType::Rsi(n) => calculate_rsi(bars, n),
        IndicatorType::Atr(n) => calculate_atr(bars, n),
        IndicatorType::Cci(n) => calculate_cci(bars, n),
        IndicatorType::Mfi(n) => calculate_mfi(bars, n),
        IndicatorType::WilliamsR(n) => calculate_williams_r(bars, n),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
        IndicatorType::Stochastic { k_period, d_period } => {
            calculate_stochastic(bars, k_period, d_period)
        }
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(bars, period, stddev_mult_x100),
    }
}

pub fn compute_indicators(bars: &[PriceBar], types: &HashSet<IndicatorType>) -> IndicatorSet {
    types
        .iter()
        .map(|t| (t.clone(), calculate(bars, t)))
        .collect()
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
