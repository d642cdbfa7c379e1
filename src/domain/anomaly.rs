//! Cross-sectional trading-value anomaly detection.
//!
//! For one day's snapshot, every eligible instrument gets
//! `z = (ln(1 + trading_value) - mean) / std` where mean and population std
//! are taken over the eligible universe of that same day.
//!
//! Eligibility, in order:
//! 1. Instruments whose code or listed name contains an exclusion pattern
//!    (index trackers, leveraged and inverse products) are removed.
//! 2. Instruments below the liquidity floor are removed. The floor is the
//!    larger of the absolute floor and the configured percentile of the
//!    remaining instruments' trading values.
//!
//! Degenerate days (std == 0, or fewer than `min_sample_size` eligible
//! instruments) yield z = 0 for everyone rather than an error.

use crate::domain::snapshot::{InstrumentSnapshot, Listing, SizeBucket};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "ETF", "ETN", "KODEX", "TIGER", "ARIRANG", "KBSTAR", "HANARO", "LEVERAGE", "INVERSE",
    "레버리지", "인버스", "선물", "2X", "3X", "BULL", "BEAR", "UP", "DOWN",
];

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyConfig {
    /// Absolute minimum trading value.
    pub liquidity_floor: f64,
    /// Fraction in `[0, 1)`; 0.4 drops the least liquid 40 %.
    pub liquidity_percentile: f64,
    pub min_sample_size: usize,
    pub exclude_patterns: Vec<String>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            liquidity_floor: 0.0,
            liquidity_percentile: 0.4,
            min_sample_size: 5,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyScore {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub trading_value: f64,
    pub z_score: f64,
}

/// Case-insensitive substring match against the code and the listed name.
///
/// Short all-ASCII-letter patterns such as `UP` only match whole
/// whitespace-separated words, so that `UP` does not exclude `SUPER MICRO`.
pub fn is_excluded(instrument_id: &str, name: &str, patterns: &[String]) -> bool {
    let id = instrument_id.to_uppercase();
    let name = name.to_uppercase();
    patterns.iter().any(|raw| {
        let pattern = raw.trim().to_uppercase();
        if pattern.is_empty() {
            return false;
        }
        if pattern.len() <= 4 && pattern.chars().all(|c| c.is_ascii_alphabetic()) {
            let word_match = |s: &str| s.split_whitespace().any(|w| w == pattern);
            word_match(&id) || word_match(&name)
        } else {
            id.contains(&pattern) || name.contains(&pattern)
        }
    })
}

/// Linear-interpolated percentile of an ascending slice. `p` in `[0, 1]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Z-scores for every eligible instrument of the snapshot, sorted by z
/// descending then by code.
pub fn compute_anomaly_scores(
    snapshot: &InstrumentSnapshot,
    listing: &Listing,
    config: &AnomalyConfig,
) -> Vec<AnomalyScore> {
    let candidates: Vec<(&str, f64)> = snapshot
        .bars
        .iter()
        .filter(|b| {
            let name = listing
                .get(&b.instrument_id)
                .map(|i| i.name.as_str())
                .unwrap_or("");
            !is_excluded(&b.instrument_id, name, &config.exclude_patterns)
        })
        .map(|b| (b.instrument_id.as_str(), b.trading_value.max(0.0)))
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = candidates.iter().map(|(_, tv)| *tv).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let floor = config
        .liquidity_floor
        .max(percentile(&sorted, config.liquidity_percentile));

    let eligible: Vec<(&str, f64)> = candidates
        .into_iter()
        .filter(|(_, tv)| *tv >= floor)
        .collect();

    let logs: Vec<f64> = eligible.iter().map(|(_, tv)| tv.ln_1p()).collect();
    let n = logs.len();
    let mean = if n > 0 {
        logs.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let std = if n > 0 {
        (logs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
    } else {
        0.0
    };

    let degenerate = n < config.min_sample_size || std == 0.0 || !std.is_finite();
    if degenerate {
        warn!(
            date = %snapshot.date,
            sample = n,
            std,
            "degenerate cross-section, z-scores set to 0"
        );
    }

    let mut scores: Vec<AnomalyScore> = eligible
        .iter()
        .zip(logs.iter())
        .map(|((id, tv), log)| AnomalyScore {
            instrument_id: id.to_string(),
            date: snapshot.date,
            trading_value: *tv,
            z_score: if degenerate { 0.0 } else { (log - mean) / std },
        })
        .collect();

    scores.sort_by(|a, b| {
        b.z_score
            .total_cmp(&a.z_score)
            .then_with(|| a.instrument_id.cmp(&b.instrument_id))
    });
    scores
}

pub fn top_anomalies(scores: &[AnomalyScore], k: usize) -> &[AnomalyScore] {
    &scores[..k.min(scores.len())]
}

/// Groups already-computed scores by the snapshot's size bucket, keeping the
/// z-descending order inside each group.
pub fn scores_by_bucket<'a>(
    scores: &'a [AnomalyScore],
    snapshot: &InstrumentSnapshot,
) -> BTreeMap<SizeBucket, Vec<&'a AnomalyScore>> {
    let mut grouped: BTreeMap<SizeBucket, Vec<&AnomalyScore>> = BTreeMap::new();
    for score in scores {
        grouped
            .entry(snapshot.bucket_of(&score.instrument_id))
            .or_default()
            .push(score);
    }
    grouped
}
