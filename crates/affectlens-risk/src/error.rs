//! Errors raised while loading the category table

use thiserror::Error;

/// Errors from loading or validating a risk table
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("failed to read risk table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse risk table: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("category '{category}': invalid pattern '{pattern}': {source}")]
    Pattern {
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid risk table: {0}")]
    Invalid(String),
}

impl From<RiskError> for affectlens_core::Error {
    fn from(err: RiskError) -> Self {
        affectlens_core::Error::config(err.to_string())
    }
}
