//! Domain error types.

/// Top-level error type for indexmaker.
///
/// Only fatal conditions live here. Data gaps (a selection date without an
/// adjustment date, a rebalance date without weights, a missing price) are
/// absorbed by the engine and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
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

    #[error("unknown scenario id {id}")]
    UnknownScenario { id: i64 },

    #[error("unsupported rebalance frequency: {value}")]
    UnsupportedFrequency { value: String },

    #[error("index variant must be one of PR, GTR, NTR (got {value})")]
    UnknownVariant { value: String },

    #[error("data alignment error: {reason}")]
    DataAlignment { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn alignment(reason: impl Into<String>) -> Self {
        IndexError::DataAlignment {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        IndexError::Data {
            reason: reason.into(),
        }
    }

    /// True for the configuration family of errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            IndexError::ConfigParse { .. }
                | IndexError::ConfigMissing { .. }
                | IndexError::ConfigInvalid { .. }
                | IndexError::UnknownScenario { .. }
                | IndexError::UnsupportedFrequency { .. }
                | IndexError::UnknownVariant { .. }
        )
    }
}

impl From<&IndexError> for std::process::ExitCode {
    fn from(err: &IndexError) -> Self {
        let code: u8 = match err {
            IndexError::Io(_) => 1,
            IndexError::ConfigParse { .. }
            | IndexError::ConfigMissing { .. }
            | IndexError::ConfigInvalid { .. }
            | IndexError::UnknownScenario { .. }
            | IndexError::UnsupportedFrequency { .. }
            | IndexError::UnknownVariant { .. } => 2,
            IndexError::DataAlignment { .. } => 3,
            IndexError::Data { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
