//! Per-day cross-sectional snapshot and the instrument reference table.

use crate::domain::price_bar::PriceBar;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SizeBucket {
    Large,
    Mid,
    Small,
    Unknown,
}

impl fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SizeBucket::Large => "large",
            SizeBucket::Mid => "mid",
            SizeBucket::Small => "small",
            SizeBucket::Unknown => "unknown",
        };
        f.pad(s)
    }
}

impl FromStr for SizeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "large" | "l" | "large-cap" => Ok(SizeBucket::Large),
            "mid" | "m" | "mid-cap" => Ok(SizeBucket::Mid),
            "small" | "s" | "small-cap" => Ok(SizeBucket::Small),
            "" | "unknown" => Ok(SizeBucket::Unknown),
            other => Err(format!("unknown size bucket '{other}'")),
        }
    }
}

/// One row of the listing/reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentInfo {
    pub instrument_id: String,
    pub name: String,
    pub size_bucket: SizeBucket,
    pub classification: String,
}

pub type Listing = HashMap<String, InstrumentInfo>;

pub fn listing_from(infos: Vec<InstrumentInfo>) -> Listing {
    infos
        .into_iter()
        .map(|info| (info.instrument_id.clone(), info))
        .collect()
}

/// All bars for one trade date across the universe.
#[derive(Debug, Clone)]
pub struct InstrumentSnapshot {
    pub date: NaiveDate,
    pub bars: Vec<PriceBar>,
    pub buckets: HashMap<String, SizeBucket>,
}

impl InstrumentSnapshot {
    /// Bars dated differently from `date` are ignored. Bucket comes from the
    /// listing when it names one, otherwise from the instrument's market-cap
    /// rank (or trading-value rank when market cap is absent) in thirds.
    pub fn new(date: NaiveDate, bars: Vec<PriceBar>, listing: &Listing) -> Self {
        let bars: Vec<PriceBar> = bars.into_iter().filter(|b| b.date == date).collect();

        let mut ranked: Vec<(&str, f64)> = bars
            .iter()
            .map(|b| {
                let size = b.market_cap.unwrap_or(b.trading_value);
                (b.instrument_id.as_str(), size)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let n = ranked.len();
        let mut buckets = HashMap::with_capacity(n);
        for (rank, (id, _)) in ranked.iter().enumerate() {
            let listed = listing
                .get(*id)
                .map(|info| info.size_bucket)
                .unwrap_or(SizeBucket::Unknown);
            let bucket = if listed != SizeBucket::Unknown {
                listed
            } else if rank * 3 < n {
                SizeBucket::Large
            } else if rank * 3 < n * 2 {
                SizeBucket::Mid
            } else {
                SizeBucket::Small
            };
            buckets.insert(id.to_string(), bucket);
        }

        Self {
            date,
            bars,
            buckets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn bucket_of(&self, instrument_id: &str) -> SizeBucket {
        self.buckets
            .get(instrument_id)
            .copied()
            .unwrap_or(SizeBucket::Unknown)
    }
}
