//! Strategy condition AST.
//!
//! - `Operand`: what can be compared (bar fields, constants, indicator
//!   fields, values from earlier bars, scaled values)
//! - `IndicatorRef`: reference to one field of a computed indicator
//! - `Rule`: comparisons, crosses, boolean composition and temporal windows
//!
//! Every condition in the catalog is a plain value of these types, so the
//! catalog can be enumerated, printed and tested without evaluating it.

use crate::domain::indicator::IndicatorType;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    TradingValue,
    Constant(f64),
    Indicator(IndicatorRef),
    /// The operand's value `bars` bars before the evaluated bar.
    Lagged { operand: Box<Operand>, bars: usize },
    /// The operand's value multiplied by `factor`.
    Scaled { operand: Box<Operand>, factor: f64 },
}

impl Operand {
    pub fn indicator(indicator_type: IndicatorType) -> Self {
        Operand::Indicator(IndicatorRef {
            indicator_type,
            field: IndicatorField::Value,
        })
    }

    pub fn field(indicator_type: IndicatorType, field: IndicatorField) -> Self {
        Operand::Indicator(IndicatorRef {
            indicator_type,
            field,
        })
    }

    pub fn lagged(self, bars: usize) -> Self {
        Operand::Lagged {
            operand: Box::new(self),
            bars,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Operand::Scaled {
            operand: Box::new(self),
            factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochasticK,
    StochasticD,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    BollingerWidth,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    /// Child true on each of the last `count` bars, current bar included.
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    /// Child true on at least one of the last `count` bars.
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
}

impl Rule {
    pub fn above(left: Operand, right: Operand) -> Self {
        Rule::Above { left, right }
    }

    pub fn below(left: Operand, right: Operand) -> Self {
        Rule::Below { left, right }
    }

    pub fn cross_above(left: Operand, right: Operand) -> Self {
        Rule::CrossAbove { left, right }
    }

    pub fn cross_below(left: Operand, right: Operand) -> Self {
        Rule::CrossBelow { left, right }
    }

    pub fn consecutive(rule: Rule, count: usize) -> Self {
        Rule::Consecutive {
            rule: Box::new(rule),
            count,
        }
    }

    pub fn any_of(rule: Rule, count: usize) -> Self {
        Rule::AnyOf {
            rule: Box::new(rule),
            count,
        }
    }

    pub fn negate(rule: Rule) -> Self {
        Rule::Not(Box::new(rule))
    }

    /// How many bars before the evaluated one this rule may read.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { left, right } | Rule::CrossBelow { left, right } => {
                1 + operand_lookback(left).max(operand_lookback(right))
            }
            Rule::Above { left, right } | Rule::Below { left, right } => {
                operand_lookback(left).max(operand_lookback(right))
            }
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(0)
            }
            Rule::Not(rule) => rule.lookback(),
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                rule.lookback() + count.saturating_sub(1)
            }
        }
    }
}

fn operand_lookback(operand: &Operand) -> usize {
    match operand {
        Operand::Lagged { operand, bars } => bars + operand_lookback(operand),
        Operand::Scaled { operand, .. } => operand_lookback(operand),
        _ => 0,
    }
}

/// Every indicator the rule reads, so they can be computed up front.
pub fn extract_indicators(rule: &Rule) -> HashSet<IndicatorType> {
    let mut out = HashSet::new();
    collect_rule(rule, &mut out);
    out
}

fn collect_rule(rule: &Rule, out: &mut HashSet<IndicatorType>) {
    match rule {
        Rule::CrossAbove { left, right }
        | Rule::CrossBelow { left, right }
        | Rule::Above { left, right }
        | Rule::Below { left, right } => {
            collect_operand(left, out);
            collect_operand(right, out);
        }
        Rule::And(rules) | Rule::Or(rules) => {
            for r in rules {
                collect_rule(r, out);
            }
        }
        Rule::Not(rule) | Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => {
            collect_rule(rule, out)
        }
    }
}

fn collect_operand(operand: &Operand, out: &mut HashSet<IndicatorType>) {
    match operand {
        Operand::Indicator(r) => {
            out.insert(r.indicator_type.clone());
        }
        Operand::Lagged { operand, .. } | Operand::Scaled { operand, .. } => {
            collect_operand(operand, out)
        }
        _ => {}
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndicatorField::Value => "",
            IndicatorField::MacdLine => "line",
            IndicatorField::MacdSignal => "signal",
            IndicatorField::MacdHistogram => "histogram",
            IndicatorField::StochasticK => "k",
            IndicatorField::StochasticD => "d",
            IndicatorField::BollingerUpper => "upper",
            IndicatorField::BollingerMiddle => "middle",
            IndicatorField::BollingerLower => "lower",
            IndicatorField::BollingerWidth => "width",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => write!(f, "open"),
            Operand::High => write!(f, "high"),
            Operand::Low => write!(f, "low"),
            Operand::Close => write!(f, "close"),
            Operand::Volume => write!(f, "volume"),
            Operand::TradingValue => write!(f, "trading_value"),
            Operand::Constant(v) => write!(f, "{v}"),
            Operand::Indicator(r) => match r.field {
                IndicatorField::Value => write!(f, "{}", r.indicator_type),
                field => write!(f, "{}.{}", r.indicator_type, field),
            },
            Operand::Lagged { operand, bars } => write!(f, "{operand}[-{bars}]"),
            Operand::Scaled { operand, factor } => write!(f, "{factor}*{operand}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, r) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{r}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "{left} crosses above {right}"),
            Rule::CrossBelow { left, right } => write!(f, "{left} crosses below {right}"),
            Rule::Above { left, right } => write!(f, "{left} > {right}"),
            Rule::Below { left, right } => write!(f, "{left} < {right}"),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({rule})"),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({rule}, {count})"),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({rule}, {count})"),
        }
    }
}
