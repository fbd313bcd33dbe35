//! Domain error types.

/// Top-level error type for tickerdesk.
#[derive(Debug, thiserror::Error)]
pub enum TickerdeskError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("market data provider error: {reason}")]
    Provider { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {rows} rows, need {minimum}")]
    InsufficientData {
        ticker: String,
        rows: usize,
        minimum: usize,
    },

    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("model shape error: {reason}")]
    ModelShape { reason: String },

    #[error(
        "invalid forecast horizon {horizon}: must be between 1 and {max} days",
        max = crate::domain::forecast::MAX_HORIZON
    )]
    InvalidHorizon { horizon: usize },

    #[error("{what} is not supported by this data source")]
    Unsupported { what: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TickerdeskError {
    pub fn provider(reason: impl Into<String>) -> Self {
        TickerdeskError::Provider {
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TickerdeskError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TickerdeskError> for std::process::ExitCode {
    fn from(err: &TickerdeskError) -> Self {
        let code: u8 = match err {
            TickerdeskError::Io(_) | TickerdeskError::Report { .. } => 1,
            TickerdeskError::ConfigParse { .. }
            | TickerdeskError::ConfigMissing { .. }
            | TickerdeskError::ConfigInvalid { .. } => 2,
            TickerdeskError::Provider { .. } | TickerdeskError::Unsupported { .. } => 3,
            TickerdeskError::ModelLoad { .. } | TickerdeskError::ModelShape { .. } => 4,
            TickerdeskError::NoData { .. } | TickerdeskError::InsufficientData { .. } => 5,
            TickerdeskError::InvalidHorizon { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
