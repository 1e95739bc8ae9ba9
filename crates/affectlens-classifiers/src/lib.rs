//! affectlens Classifiers
//!
//! Sentiment, emotion and aspect analyzers built on pluggable inference
//! providers.
//!
//! - [`InferenceProvider`] implementations produce raw label scores: the
//!   Hugging Face Inference API for model-backed operation, a keyword lexicon
//!   for local or degraded operation.
//! - Adapters map provider labels onto the closed sentiment and emotion label
//!   sets and apply the labelling rules.
//! - [`AnalysisService`] memoizes results by content hash, fuses them with the
//!   risk engine and fans bulk requests out with per-item failure isolation.
//! - [`Analyzers::initialize`] builds the whole stack from configuration and
//!   reports readiness.

pub mod adapter;
pub mod aspects;
pub mod cache;
pub mod config;
pub mod huggingface;
pub mod lexicon;
pub mod lifecycle;
pub mod provider;
pub mod service;

pub use adapter::{truncate_chars, EmotionAdapter, LabelAdapter, SentimentAdapter};
pub use aspects::{
    AspectAnalysis, AspectPipeline, AspectVerdict, Annotation, Annotator, BasicAnnotator,
    OverallSentiment,
};
pub use cache::{AnalysisCache, MemoryCache, NoopCache};
#[cfg(feature = "redis")]
pub use cache::RedisCache;
pub use config::{
    AnalyzerConfig, AspectConfig, BulkConfig, CacheBackendSpec, CacheConfig, HuggingFaceConfig,
    ProviderSpec, ProvidersConfig, RiskConfig,
};
pub use huggingface::HuggingFaceProvider;
pub use lexicon::LexiconProvider;
pub use lifecycle::{readiness_channel, Analyzers};
pub use provider::{InferenceProvider, LabelScores};
pub use service::{AnalysisService, BulkItem, BulkReport, FullAnalysis};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aspects::{AspectAnalysis, Annotator};
    pub use crate::cache::AnalysisCache;
    pub use crate::config::AnalyzerConfig;
    pub use crate::lifecycle::Analyzers;
    pub use crate::provider::InferenceProvider;
    pub use crate::service::AnalysisService;
}
