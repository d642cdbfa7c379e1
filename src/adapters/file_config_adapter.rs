//! INI file configuration adapter.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[data]
snapshot_dir = /srv/snapshots
reference_instrument = KOSPI

[backtest]
lookback_window_days = 730
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "snapshot_dir"),
            Some("/srv/snapshots".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "reference_instrument"),
            Some("KOSPI".to_string())
        );
        assert_eq!(adapter.get_int("backtest", "lookback_window_days", 365), 730);
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank_key() {
        let adapter = FileConfigAdapter::from_string("[data]\nsignal_log_path =\n").unwrap();
        assert_eq!(adapter.get_string("data", "signal_log_path"), None);
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numeric_getters_fall_back_to_default() {
        let adapter = FileConfigAdapter::from_string(
            "[selection]\ntop_k = abc\nhigh_confidence_override_threshold = 75.5\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("selection", "top_k", 5), 5);
        assert_eq!(adapter.get_int("selection", "missing", 42), 42);
        assert_eq!(
            adapter.get_double("selection", "high_confidence_override_threshold", 80.0),
            75.5
        );
        assert_eq!(adapter.get_double("selection", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(
            "[anomaly]\nexclude_patterns = ETF, ETN ,,KODEX\n[selection]\ndiversity_penalty_weights = 0.8,0.9\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_list("anomaly", "exclude_patterns"),
            Some(vec!["ETF".to_string(), "ETN".to_string(), "KODEX".to_string()])
        );
        assert_eq!(
            adapter.get_list("selection", "diversity_penalty_weights"),
            Some(vec!["0.8".to_string(), "0.9".to_string()])
        );
        assert_eq!(adapter.get_list("anomaly", "missing"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\nlisting_path = /srv/listing.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "listing_path"),
            Some("/srv/listing.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_parse_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }
}
