//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for dcasim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DcasimError {
    #[error("no price for {symbol} on or before {date} within the snap lookback")]
    DataGap { symbol: String, date: NaiveDate },

    #[error("insufficient data: {reason} ({dropped} experiments dropped)")]
    InsufficientData { reason: String, dropped: usize },

    #[error("invalid configuration [{section}] {key}: {reason}")]
    InvalidConfiguration {
        section: String,
        key: String,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("data load error: {reason}")]
    DataLoad { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("io error: {0}")]
    Io(String),
}

impl DcasimError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        DcasimError::InvalidConfiguration {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_data_gap(&self) -> bool {
        matches!(self, DcasimError::DataGap { .. })
    }
}

impl From<std::io::Error> for DcasimError {
    fn from(err: std::io::Error) -> Self {
        DcasimError::Io(err.to_string())
    }
}

impl From<&DcasimError> for std::process::ExitCode {
    fn from(err: &DcasimError) -> Self {
        let code: u8 = match err {
            DcasimError::Io(_) | DcasimError::Report { .. } => 1,
            DcasimError::ConfigParse { .. }
            | DcasimError::ConfigMissing { .. }
            | DcasimError::InvalidConfiguration { .. } => 2,
            DcasimError::DataLoad { .. } => 3,
            DcasimError::DataGap { .. } | DcasimError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
