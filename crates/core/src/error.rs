use serde::Serialize;

/// Failure kinds surfaced by the allocation core.
///
/// Collaborator failures arrive as `anyhow::Error` and are folded into
/// [`CoreError::DataUnavailable`] at the fetch boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("data unavailable for {what}: {reason}")]
    DataUnavailable { what: String, reason: String },

    #[error("insufficient history for {series}: need {required} samples, got {available}")]
    InsufficientHistory {
        series: String,
        required: usize,
        available: usize,
    },

    #[error("current price unavailable for {asset}")]
    PriceUnavailable { asset: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DataUnavailable,
    InsufficientHistory,
    PriceUnavailable,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::PriceUnavailable { .. } => ErrorKind::PriceUnavailable,
        }
    }

    pub(crate) fn data_unavailable(what: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::DataUnavailable {
            what: what.into(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn insufficient(series: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientHistory {
            series: series.into(),
            required,
            available,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
