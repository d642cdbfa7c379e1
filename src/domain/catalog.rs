//! Static strategy catalog.
//!
//! Each entry pairs a condition (`Rule`) with its category, trade side,
//! optional holding horizon and the narrative template used in reports.
//! The catalog knows nothing about regimes or scoring.

use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{extract_indicators, IndicatorField, Operand, Rule};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyCategory {
    Momentum,
    Trend,
    Reversal,
    Breakdown,
}

impl fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyCategory::Momentum => "momentum",
            StrategyCategory::Trend => "trend",
            StrategyCategory::Reversal => "reversal",
            StrategyCategory::Breakdown => "breakdown",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => f.pad("long"),
            PositionSide::Short => f.pad("short"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyDefinition {
    pub name: String,
    pub category: StrategyCategory,
    pub side: PositionSide,
    /// Falls back to the configured horizon when `None`.
    pub holding_days: Option<usize>,
    pub condition: Rule,
    pub narrative_template: String,
}

impl StrategyDefinition {
    pub fn holding_or(&self, default_days: usize) -> usize {
        self.holding_days.unwrap_or(default_days)
    }

    /// Longest warm-up among the indicators the condition reads.
    pub fn indicator_warmup(&self) -> usize {
        extract_indicators(&self.condition)
            .iter()
            .map(IndicatorType::warmup)
            .max()
            .unwrap_or(0)
    }

    /// Bars after which every operand of the condition is defined at every
    /// lag it reads.
    pub fn min_bars(&self) -> usize {
        self.indicator_warmup() + self.condition.lookback() + 1
    }
}

/// Union of the indicators read by every strategy in `strategies`.
pub fn required_indicators(strategies: &[StrategyDefinition]) -> HashSet<IndicatorType> {
    strategies
        .iter()
        .flat_map(|s| extract_indicators(&s.condition))
        .collect()
}

pub fn find<'a>(strategies: &'a [StrategyDefinition], name: &str) -> Option<&'a StrategyDefinition> {
    strategies.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

fn sma(n: usize) -> Operand {
    Operand::indicator(IndicatorType::Sma(n))
}

fn ema(n: usize) -> Operand {
    Operand::indicator(IndicatorType::Ema(n))
}

fn rsi() -> Operand {
    Operand::indicator(IndicatorType::Rsi(14))
}

fn cci() -> Operand {
    Operand::indicator(IndicatorType::Cci(20))
}

fn mfi() -> Operand {
    Operand::indicator(IndicatorType::Mfi(14))
}

fn williams_r() -> Operand {
    Operand::indicator(IndicatorType::WilliamsR(14))
}

fn atr() -> Operand {
    Operand::indicator(IndicatorType::Atr(14))
}

fn volume_sma() -> Operand {
    Operand::indicator(IndicatorType::VolumeSma(20))
}

fn macd(field: IndicatorField) -> Operand {
    Operand::field(
        IndicatorType::Macd {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
        },
        field,
    )
}

fn stochastic(field: IndicatorField) -> Operand {
    Operand::field(
        IndicatorType::Stochastic {
            k_period: 14,
            d_period: 3,
        },
        field,
    )
}

fn bollinger(field: IndicatorField) -> Operand {
    Operand::field(
        IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        },
        field,
    )
}

fn c(v: f64) -> Operand {
    Operand::Constant(v)
}

fn white_candle_higher() -> Rule {
    Rule::And(vec![
        Rule::above(Operand::Close, Operand::Open),
        Rule::above(Operand::Close, Operand::Close.lagged(1)),
    ])
}

fn black_candle_lower() -> Rule {
    Rule::And(vec![
        Rule::below(Operand::Close, Operand::Open),
        Rule::below(Operand::Close, Operand::Close.lagged(1)),
    ])
}

/// Yesterday's range sat inside the day before's.
fn inside_bar_yesterday() -> Rule {
    Rule::And(vec![
        Rule::below(Operand::High.lagged(1), Operand::High.lagged(2)),
        Rule::above(Operand::Low.lagged(1), Operand::Low.lagged(2)),
    ])
}

fn volume_surge(multiple: f64) -> Rule {
    Rule::above(Operand::Volume, volume_sma().lagged(1).scaled(multiple))
}

fn def(
    name: &str,
    category: StrategyCategory,
    side: PositionSide,
    holding_days: Option<usize>,
    condition: Rule,
    narrative_template: &str,
) -> StrategyDefinition {
    StrategyDefinition {
        name: name.to_string(),
        category,
        side,
        holding_days,
        condition,
        narrative_template: narrative_template.to_string(),
    }
}

/// The full strategy table, in presentation order.
pub fn catalog() -> Vec<StrategyDefinition> {
    use PositionSide::{Long, Short};
    use StrategyCategory::{Breakdown, Momentum, Reversal, Trend};

    vec![
        // Momentum
        def(
            "Volume Spike Breakout",
            Momentum,
            Long,
            None,
            Rule::And(vec![
                volume_surge(3.0),
                Rule::above(Operand::Close, Operand::High.lagged(1)),
                Rule::above(Operand::Close, Operand::Open),
            ]),
            "{instrument} cleared yesterday's high on triple its usual volume. {name} setups won {win_rate}% of {trades} trades over {holding} days (avg {avg_return}%).",
        ),
        def(
            "Bollinger Squeeze Breakout",
            Momentum,
            Long,
            None,
            Rule::And(vec![
                Rule::any_of(
                    Rule::below(bollinger(IndicatorField::BollingerWidth).lagged(1), c(0.10)),
                    5,
                ),
                Rule::cross_above(Operand::Close, bollinger(IndicatorField::BollingerUpper)),
            ]),
            "After a tight squeeze {instrument} broke the upper band. History: {win_rate}% wins, {avg_return}% average, {trades} trades.",
        ),
        def(
            "Inside Bar Breakout",
            Momentum,
            Long,
            None,
            Rule::And(vec![
                inside_bar_yesterday(),
                Rule::above(Operand::Close, Operand::High.lagged(1)),
            ]),
            "{instrument} escaped an inside bar to the upside. {name}: {win_rate}% hit rate across {trades} trades.",
        ),
        def(
            "Three White Soldiers",
            Momentum,
            Long,
            None,
            Rule::consecutive(white_candle_higher(), 3),
            "Three straight advancing candles on {instrument}. Past runs returned {avg_return}% over {holding} days ({trades} trades).",
        ),
        def(
            "MACD Zero-Line Surge",
            Momentum,
            Long,
            None,
            Rule::cross_above(macd(IndicatorField::MacdLine), c(0.0)),
            "MACD on {instrument} pushed through zero. {name} scored {score} with {win_rate}% wins.",
        ),
        def(
            "CCI Momentum Burst",
            Momentum,
            Long,
            None,
            Rule::cross_above(cci(), c(100.0)),
            "CCI on {instrument} burst above +100. {trades} similar bursts averaged {avg_return}%.",
        ),
        def(
            "Gap Up Continuation",
            Momentum,
            Long,
            None,
            Rule::And(vec![
                Rule::above(Operand::Open, Operand::High.lagged(1)),
                Rule::above(Operand::Close, Operand::Open),
            ]),
            "{instrument} gapped above yesterday's high and held it. {win_rate}% of {trades} gaps followed through.",
        ),
        def(
            "Williams %R Breakout",
            Momentum,
            Long,
            None,
            Rule::cross_above(williams_r(), c(-20.0)),
            "Williams %R on {instrument} entered the strength zone. Average follow-through {avg_return}% over {holding} days.",
        ),
        // Trend
        def(
            "Golden Cross",
            Trend,
            Long,
            Some(5),
            Rule::cross_above(sma(20), sma(60)),
            "MA20 crossed above MA60 on {instrument}. {name} held {holding} days: {win_rate}% wins, {avg_return}% average.",
        ),
        def(
            "EMA Ribbon Alignment",
            Trend,
            Long,
            Some(5),
            Rule::And(vec![
                Rule::cross_above(ema(5), ema(20)),
                Rule::above(ema(20), ema(60)),
            ]),
            "Short EMAs on {instrument} realigned above the long trend. {trades} past alignments, {win_rate}% profitable.",
        ),
        def(
            "MACD Signal Cross",
            Trend,
            Long,
            Some(5),
            Rule::And(vec![
                Rule::cross_above(macd(IndicatorField::MacdLine), macd(IndicatorField::MacdSignal)),
                Rule::above(macd(IndicatorField::MacdLine), c(0.0)),
            ]),
            "MACD on {instrument} crossed its signal line above zero. Score {score}.",
        ),
        def(
            "Pullback To MA20",
            Trend,
            Long,
            Some(5),
            Rule::And(vec![
                Rule::above(sma(20), sma(60)),
                Rule::below(Operand::Low, sma(20)),
                Rule::above(Operand::Close, sma(20)),
            ]),
            "{instrument} dipped to MA20 inside an uptrend and closed back above it. {win_rate}% of {trades} pullbacks paid.",
        ),
        def(
            "MFI Accumulation Trend",
            Trend,
            Long,
            Some(5),
            Rule::And(vec![
                Rule::cross_above(mfi(), c(60.0)),
                Rule::above(Operand::Close, sma(20)),
            ]),
            "Money flow into {instrument} turned decisively positive above MA20. Avg {avg_return}% over {holding} days.",
        ),
        def(
            "Rising Channel Hold",
            Trend,
            Long,
            Some(5),
            Rule::And(vec![
                Rule::consecutive(Rule::above(Operand::Close, sma(20)), 10),
                Rule::above(sma(20), sma(20).lagged(5)),
            ]),
            "{instrument} has closed above a rising MA20 for ten sessions. {name}: {trades} trades, score {score}.",
        ),
        // Reversal
        def(
            "RSI Panic Buy",
            Reversal,
            Long,
            None,
            Rule::cross_below(rsi(), c(30.0)),
            "RSI on {instrument} collapsed below 30. Panic entries won {win_rate}% of {trades} times, averaging {avg_return}% in {holding} days.",
        ),
        def(
            "Bollinger Lower Bounce",
            Reversal,
            Long,
            None,
            Rule::cross_above(Operand::Close, bollinger(IndicatorField::BollingerLower)),
            "{instrument} climbed back inside the lower band. {win_rate}% of {trades} bounces worked.",
        ),
        def(
            "Stochastic Oversold Cross",
            Reversal,
            Long,
            None,
            Rule::And(vec![
                Rule::cross_above(
                    stochastic(IndicatorField::StochasticK),
                    stochastic(IndicatorField::StochasticD),
                ),
                Rule::below(stochastic(IndicatorField::StochasticD), c(20.0)),
            ]),
            "%K crossed %D deep in oversold territory on {instrument}. Avg {avg_return}% over {holding} days.",
        ),
        def(
            "CCI Oversold Reversal",
            Reversal,
            Long,
            None,
            Rule::cross_above(cci(), c(-100.0)),
            "CCI on {instrument} recovered from below -100. {name} score {score}.",
        ),
        def(
            "Williams %R Capitulation",
            Reversal,
            Long,
            None,
            Rule::cross_above(williams_r(), c(-80.0)),
            "Williams %R on {instrument} lifted out of capitulation. {trades} prior signals, {win_rate}% winners.",
        ),
        def(
            "MFI Exhaustion Buy",
            Reversal,
            Long,
            None,
            Rule::cross_above(mfi(), c(20.0)),
            "Selling pressure on {instrument} looks spent (MFI back above 20). Avg {avg_return}%.",
        ),
        def(
            "Hammer Below MA20",
            Reversal,
            Long,
            None,
            Rule::And(vec![
                Rule::below(Operand::Close, sma(20)),
                Rule::below(Operand::Low, Operand::Open.scaled(0.97)),
                Rule::above(Operand::Close, Operand::High.scaled(0.99)),
            ]),
            "A long lower wick on {instrument} below MA20 shows buyers stepping in. {win_rate}% of {trades} hammers paid.",
        ),
        def(
            "Oversold Three-Day Slide",
            Reversal,
            Long,
            None,
            Rule::And(vec![
                Rule::consecutive(black_candle_lower(), 3),
                Rule::below(rsi(), c(35.0)),
            ]),
            "Three red days pushed {instrument} into oversold. Rebounds averaged {avg_return}% over {holding} days.",
        ),
        // Breakdown (short mirrors)
        def(
            "RSI Blow-off Short",
            Breakdown,
            Short,
            None,
            Rule::cross_above(rsi(), c(80.0)),
            "RSI on {instrument} spiked above 80. Fading the blow-off won {win_rate}% of {trades} times.",
        ),
        def(
            "Dead Cross",
            Breakdown,
            Short,
            Some(5),
            Rule::cross_below(sma(20), sma(60)),
            "MA20 fell through MA60 on {instrument}. Shorts held {holding} days averaged {avg_return}%.",
        ),
        def(
            "MACD Bear Cross",
            Breakdown,
            Short,
            None,
            Rule::And(vec![
                Rule::cross_below(macd(IndicatorField::MacdLine), macd(IndicatorField::MacdSignal)),
                Rule::below(macd(IndicatorField::MacdLine), c(0.0)),
            ]),
            "MACD on {instrument} rolled over below zero. {name} score {score}.",
        ),
        def(
            "Three Black Crows",
            Breakdown,
            Short,
            None,
            Rule::consecutive(black_candle_lower(), 3),
            "Three straight declining candles on {instrument}. Shorting the pattern won {win_rate}% of {trades} times.",
        ),
        def(
            "Bollinger Upper Rejection",
            Breakdown,
            Short,
            None,
            Rule::cross_below(Operand::Close, bollinger(IndicatorField::BollingerUpper)),
            "{instrument} slipped back under the upper band. Avg short return {avg_return}%.",
        ),
        def(
            "Volume Climax Breakdown",
            Breakdown,
            Short,
            None,
            Rule::And(vec![
                volume_surge(3.0),
                Rule::below(Operand::Close, Operand::Low.lagged(1)),
                Rule::below(Operand::Close, Operand::Open),
            ]),
            "Heavy volume drove {instrument} under yesterday's low. {trades} similar days, {win_rate}% shorts won.",
        ),
        def(
            "Inside Bar Breakdown",
            Breakdown,
            Short,
            None,
            Rule::And(vec![
                inside_bar_yesterday(),
                Rule::below(Operand::Close, Operand::Low.lagged(1)),
            ]),
            "{instrument} broke down out of an inside bar. Avg {avg_return}% over {holding} days.",
        ),
        def(
            "Stochastic Overbought Cross",
            Breakdown,
            Short,
            None,
            Rule::And(vec![
                Rule::cross_below(
                    stochastic(IndicatorField::StochasticK),
                    stochastic(IndicatorField::StochasticD),
                ),
                Rule::above(stochastic(IndicatorField::StochasticD), c(80.0)),
            ]),
            "%K turned under %D in overbought territory on {instrument}. {win_rate}% of {trades} fades worked.",
        ),
        def(
            "Support Breakdown MA60",
            Breakdown,
            Short,
            None,
            Rule::cross_below(Operand::Close, sma(60)),
            "{instrument} closed below MA60 support. {name} score {score}.",
        ),
        def(
            "ATR Expansion Breakdown",
            Breakdown,
            Short,
            None,
            Rule::And(vec![
                Rule::above(atr(), atr().lagged(5).scaled(1.5)),
                Rule::below(Operand::Close, sma(20)),
            ]),
            "Volatility on {instrument} expanded sharply below MA20. Shorts averaged {avg_return}% over {holding} days.",
        ),
    ]
}
