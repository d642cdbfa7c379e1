//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for signaldesk.
///
/// Stage-local problems (a missing day, a short history, a zero standard
/// deviation) are recovered where they happen and only logged. The variants
/// here are the ones that cross a stage boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("data gap on {date}: {reason}")]
    DataGap { date: NaiveDate, reason: String },

    #[error("insufficient history for {instrument}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        instrument: String,
        bars: usize,
        minimum: usize,
    },

    #[error("insufficient data for {date}")]
    NoHistory { date: NaiveDate },

    #[error("snapshot error: {reason}")]
    Snapshot { reason: String },

    #[error("signal log error: {reason}")]
    SignalLog { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Snapshot { .. } | EngineError::SignalLog { .. } => 3,
            EngineError::DataGap { .. }
            | EngineError::InsufficientHistory { .. }
            | EngineError::NoHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_message_names_the_date() {
        let err = EngineError::NoHistory {
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        };
        assert_eq!(err.to_string(), "insufficient data for 2024-03-08");
    }

    #[test]
    fn invalid_helper_builds_config_invalid() {
        let err = EngineError::invalid("selection", "top_k", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [selection] top_k: must be positive"
        );
    }
}
