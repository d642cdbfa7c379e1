//! Typed engine configuration, read once from a `ConfigPort`.

use crate::domain::anomaly::AnomalyConfig;
use crate::domain::backtest::BacktestConfig;
use crate::domain::error::EngineError;
use crate::domain::selector::SelectionConfig;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub snapshot_dir: PathBuf,
    pub listing_path: PathBuf,
    /// Diversity ledger source. No path means no penalty.
    pub signal_log_path: Option<PathBuf>,
    /// Instrument whose history drives regime classification.
    pub reference_instrument: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("./data/snapshots"),
            listing_path: PathBuf::from("./data/listing.csv"),
            signal_log_path: None,
            reference_instrument: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    pub anomaly: AnomalyConfig,
    pub selection: SelectionConfig,
}

impl EngineConfig {
    /// Reads every section, falling back to defaults for absent keys.
    ///
    /// Only list values are parsed strictly here; range checks live in
    /// `config_validation`.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, EngineError> {
        let defaults = EngineConfig::default();

        let data = DataConfig {
            snapshot_dir: port
                .get_string("data", "snapshot_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.data.snapshot_dir),
            listing_path: port
                .get_string("data", "listing_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.data.listing_path),
            signal_log_path: port.get_string("data", "signal_log_path").map(PathBuf::from),
            reference_instrument: port.get_string("data", "reference_instrument"),
        };

        let b = &defaults.backtest;
        let backtest = BacktestConfig {
            lookback_window_days: port.get_int(
                "backtest",
                "lookback_window_days",
                b.lookback_window_days,
            ),
            holding_horizon_days: non_negative(
                "backtest",
                "holding_horizon_days",
                port.get_int("backtest", "holding_horizon_days", b.holding_horizon_days as i64),
            )?,
            min_trade_count: non_negative(
                "backtest",
                "min_trade_count",
                port.get_int("backtest", "min_trade_count", b.min_trade_count as i64),
            )?,
            low_sample_score_cap: port.get_double(
                "backtest",
                "low_sample_score_cap",
                b.low_sample_score_cap,
            ),
        };

        let a = &defaults.anomaly;
        let anomaly = AnomalyConfig {
            liquidity_floor: port.get_double("anomaly", "liquidity_floor", a.liquidity_floor),
            liquidity_percentile: port.get_double(
                "anomaly",
                "liquidity_percentile",
                a.liquidity_percentile,
            ),
            min_sample_size: non_negative(
                "anomaly",
                "min_sample_size",
                port.get_int("anomaly", "min_sample_size", a.min_sample_size as i64),
            )?,
            exclude_patterns: port
                .get_list("anomaly", "exclude_patterns")
                .unwrap_or_else(|| a.exclude_patterns.clone()),
        };

        let s = &defaults.selection;
        let selection = SelectionConfig {
            high_confidence_override_threshold: port.get_double(
                "selection",
                "high_confidence_override_threshold",
                s.high_confidence_override_threshold,
            ),
            diversity_penalty_weights: match port.get_list("selection", "diversity_penalty_weights")
            {
                Some(items) => parse_weights(&items)?,
                None => s.diversity_penalty_weights.clone(),
            },
            top_k: non_negative(
                "selection",
                "top_k",
                port.get_int("selection", "top_k", s.top_k as i64),
            )?,
        };

        Ok(Self {
            data,
            backtest,
            anomaly,
            selection,
        })
    }
}

fn non_negative(section: &str, key: &str, value: i64) -> Result<usize, EngineError> {
    usize::try_from(value).map_err(|_| EngineError::invalid(section, key, "must not be negative"))
}

fn parse_weights(items: &[String]) -> Result<Vec<f64>, EngineError> {
    items
        .iter()
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                EngineError::invalid(
                    "selection",
                    "diversity_penalty_weights",
                    format!("'{s}' is not a number"),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn load(content: &str) -> Result<EngineConfig, EngineError> {
        EngineConfig::from_port(&FileConfigAdapter::from_string(content).unwrap())
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = load("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.backtest.holding_horizon_days, 3);
        assert_eq!(config.selection.diversity_penalty_weights, vec![0.8, 0.9]);
        assert!(config.data.signal_log_path.is_none());
    }

    #[test]
    fn reads_every_section() {
        let config = load(
            r#"
[data]
snapshot_dir = /srv/snap
listing_path = /srv/listing.csv
signal_log_path = /srv/log.csv
reference_instrument = BTC-USD

[backtest]
lookback_window_days = 730
holding_horizon_days = 5
min_trade_count = 4
low_sample_score_cap = 35

[anomaly]
liquidity_floor = 1000000000
liquidity_percentile = 0.5
min_sample_size = 8
exclude_patterns = ETF,INVERSE

[selection]
high_confidence_override_threshold = 85
diversity_penalty_weights = 0.7,0.85,0.95
top_k = 3
"#,
        )
        .unwrap();
        assert_eq!(config.data.snapshot_dir, PathBuf::from("/srv/snap"));
        assert_eq!(config.data.signal_log_path, Some(PathBuf::from("/srv/log.csv")));
        assert_eq!(config.data.reference_instrument.as_deref(), Some("BTC-USD"));
        assert_eq!(config.backtest.lookback_window_days, 730);
        assert_eq!(config.backtest.holding_horizon_days, 5);
        assert_eq!(config.backtest.min_trade_count, 4);
        assert_eq!(config.backtest.low_sample_score_cap, 35.0);
        assert_eq!(config.anomaly.liquidity_floor, 1e9);
        assert_eq!(config.anomaly.min_sample_size, 8);
        assert_eq!(config.anomaly.exclude_patterns, vec!["ETF", "INVERSE"]);
        assert_eq!(config.selection.high_confidence_override_threshold, 85.0);
        assert_eq!(config.selection.diversity_penalty_weights, vec![0.7, 0.85, 0.95]);
        assert_eq!(config.selection.top_k, 3);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let err = load("[selection]\ntop_k = -1\n").unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { key, .. } if key == "top_k"));
    }

    #[test]
    fn non_numeric_weights_are_rejected() {
        let err = load("[selection]\ndiversity_penalty_weights = 0.8,high\n").unwrap_err();
        assert!(
            matches!(err, EngineError::ConfigInvalid { key, .. } if key == "diversity_penalty_weights")
        );
    }
}
