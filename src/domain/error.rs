//! Domain error types.

/// Top-level error type for coinstrat.
///
/// Trade refusals and no-ops are not errors; they are structured
/// [`TradeOutcome`](crate::domain::ledger::TradeOutcome) values. Errors here
/// mean the caller handed us something unusable or a collaborator failed.
#[derive(Debug, thiserror::Error)]
pub enum CoinstratError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("non-finite value in {context}")]
    NonFinite { context: String },

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

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("no price data for {asset}")]
    NoData { asset: String },

    #[error("prediction failed: {reason}")]
    Prediction { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CoinstratError> for std::process::ExitCode {
    fn from(err: &CoinstratError) -> Self {
        let code: u8 = match err {
            CoinstratError::Io(_) => 1,
            CoinstratError::ConfigParse { .. }
            | CoinstratError::ConfigMissing { .. }
            | CoinstratError::ConfigInvalid { .. } => 2,
            CoinstratError::Store { .. } => 3,
            CoinstratError::InvalidInput { .. } | CoinstratError::NonFinite { .. } => 4,
            CoinstratError::NoData { .. } | CoinstratError::Prediction { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
