//! Analyzer construction and readiness
//!
//! [`Analyzers::initialize`] builds every collaborator in dependency order and
//! publishes the resulting [`Readiness`] on a watch channel. Callers hold the
//! receiving end and report it from their readiness endpoint.

use affectlens_core::{Readiness, Result};
use affectlens_risk::{CategoryRegistry, RiskEngine};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::{EmotionAdapter, LabelAdapter, SentimentAdapter};
use crate::aspects::{Annotator, AspectPipeline, BasicAnnotator};
use crate::cache::{AnalysisCache, MemoryCache};
use crate::config::{AnalyzerConfig, CacheBackendSpec, ProviderSpec};
use crate::huggingface::HuggingFaceProvider;
use crate::lexicon::LexiconProvider;
use crate::provider::InferenceProvider;
use crate::service::AnalysisService;

/// Readiness channel starting in [`Readiness::Loading`]
pub fn readiness_channel() -> (watch::Sender<Readiness>, watch::Receiver<Readiness>) {
    watch::channel(Readiness::Loading)
}

/// The constructed analysis stack
pub struct Analyzers {
    pub service: Arc<AnalysisService>,
    pub readiness: Readiness,
}

struct ResolvedProvider {
    provider: Arc<dyn InferenceProvider>,
    aliases: HashMap<String, String>,
    substituted: bool,
}

impl Analyzers {
    /// Build with the built-in tokenizer as annotator
    pub async fn initialize(
        config: &AnalyzerConfig,
        readiness: &watch::Sender<Readiness>,
    ) -> Result<Self> {
        Self::initialize_with(config, Arc::new(BasicAnnotator::new()), readiness).await
    }

    /// Build with a caller-supplied annotator.
    ///
    /// Fails when a remote provider is unreachable and lexicon fallback is
    /// disabled; the readiness channel then stays in `Loading`.
    pub async fn initialize_with(
        config: &AnalyzerConfig,
        annotator: Arc<dyn Annotator>,
        readiness: &watch::Sender<Readiness>,
    ) -> Result<Self> {
        info!("Initializing analyzers");

        let sentiment = resolve_provider(
            "sentiment",
            &config.providers.sentiment,
            config.fallback_to_lexicon,
            LexiconProvider::sentiment,
        )
        .await?;
        let emotion = resolve_provider(
            "emotion",
            &config.providers.emotion,
            config.fallback_to_lexicon,
            LexiconProvider::emotion,
        )
        .await?;
        let degraded = sentiment.substituted || emotion.substituted;

        let sentiment = Arc::new(SentimentAdapter::new(
            LabelAdapter::new(sentiment.provider, sentiment.aliases, config.max_input_chars),
            config.aspects.neutral_margin,
        ));
        let emotion = Arc::new(EmotionAdapter::new(LabelAdapter::new(
            emotion.provider,
            emotion.aliases,
            config.max_input_chars,
        )));

        let registry = match &config.risk.categories_path {
            Some(path) => CategoryRegistry::from_file(path)?,
            None => CategoryRegistry::builtin()?,
        };
        info!(categories = registry.len(), "Risk registry loaded");
        let risk = RiskEngine::new(Arc::new(registry));

        let cache: Arc<dyn AnalysisCache> = match &config.cache.backend {
            CacheBackendSpec::Memory { max_entries } => Arc::new(MemoryCache::new(*max_entries)),
            CacheBackendSpec::Redis { url } => redis_cache(url).await?,
        };

        let aspects = AspectPipeline::new(annotator, sentiment.clone(), config.aspects.clone());

        let service = AnalysisService::new(sentiment, emotion, risk, aspects, cache)
            .with_ttl(config.cache.ttl())
            .with_bulk_concurrency(config.bulk.concurrency);

        let state = if degraded {
            Readiness::Degraded
        } else {
            Readiness::Ready
        };
        readiness.send_replace(state);
        info!(
            readiness = ?state,
            cache = service.cache_backend(),
            "Analyzers initialized"
        );

        Ok(Self {
            service: Arc::new(service),
            readiness: state,
        })
    }
}

async fn resolve_provider(
    task: &'static str,
    spec: &ProviderSpec,
    fallback_to_lexicon: bool,
    lexicon: fn() -> Result<LexiconProvider>,
) -> Result<ResolvedProvider> {
    let hf = match spec {
        ProviderSpec::Lexicon => {
            info!(task, "Using lexicon provider");
            return Ok(ResolvedProvider {
                provider: Arc::new(lexicon()?),
                aliases: HashMap::new(),
                substituted: false,
            });
        }
        ProviderSpec::Huggingface(hf) => hf,
    };

    let provider = HuggingFaceProvider::new(task, hf)?;
    match provider.probe().await {
        Ok(()) => {
            info!(task, model = %hf.model, "Inference provider ready");
            Ok(ResolvedProvider {
                provider: Arc::new(provider),
                aliases: spec.label_aliases(),
                substituted: false,
            })
        }
        Err(e) if e.is_dependency_unavailable() && fallback_to_lexicon => {
            warn!(
                task,
                model = %hf.model,
                error = %e,
                "Inference provider unreachable, substituting lexicon"
            );
            Ok(ResolvedProvider {
                provider: Arc::new(lexicon()?),
                aliases: HashMap::new(),
                substituted: true,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(feature = "redis")]
async fn redis_cache(url: &str) -> Result<Arc<dyn AnalysisCache>> {
    Ok(Arc::new(crate::cache::RedisCache::connect(url).await?))
}

#[cfg(not(feature = "redis"))]
async fn redis_cache(_url: &str) -> Result<Arc<dyn AnalysisCache>> {
    Err(affectlens_core::Error::config(
        "redis cache backend requires the `redis` feature",
    ))
}
