//! Inference provider trait

use affectlens_core::Result;
use async_trait::async_trait;

/// Raw `(label, score)` pairs as returned by a provider
pub type LabelScores = Vec<(String, f64)>;

/// A source of label scores for a piece of text.
///
/// Providers return labels in their own vocabulary; adapters map them onto a
/// closed label set. Unreachable or unloaded providers must fail with
/// [`affectlens_core::Error::ModelUnavailable`].
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Score `text` over the provider's labels
    async fn infer(&self, text: &str) -> Result<LabelScores>;

    /// Provider name for logs and errors
    fn name(&self) -> &str;

    /// Whether this provider runs in-process
    fn is_local(&self) -> bool {
        false
    }

    /// Check that the provider can answer
    async fn probe(&self) -> Result<()> {
        self.infer("ok").await.map(|_| ())
    }
}
