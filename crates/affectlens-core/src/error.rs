//! Error types for affectlens

/// Result type alias using affectlens' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for affectlens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier execution errors (bad provider output, label mapping)
    #[error("classifier error: {0}")]
    Classifier(String),

    /// An inference provider is not loaded or not reachable
    #[error("model unavailable ({provider}): {reason}")]
    ModelUnavailable { provider: String, reason: String },

    /// The linguistic annotator is not loaded or failed
    #[error("annotator unavailable: {0}")]
    AnnotatorUnavailable(String),

    /// Input rejected before analysis
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Cache backend errors
    #[error("cache error: {0}")]
    Cache(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create a new annotator-unavailable error
    pub fn annotator(msg: impl Into<String>) -> Self {
        Self::AnnotatorUnavailable(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means a collaborator (model or annotator) is missing.
    pub fn is_dependency_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. } | Self::AnnotatorUnavailable(_) | Self::Timeout
        )
    }
}
