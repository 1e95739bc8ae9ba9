//! Cache-fronted analysis facade
//!
//! Classifier results are memoized by content hash. Risk verdicts are always
//! recomputed from the (possibly cached) classifier outputs, so a change to the
//! category table takes effect without flushing the cache.

use affectlens_core::{content_key, ClassificationResult, Emotion, Error, Result, Sentiment};
use affectlens_risk::{RiskEngine, RiskVerdict};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapter::{EmotionAdapter, SentimentAdapter};
use crate::aspects::{AspectAnalysis, AspectPipeline};
use crate::cache::AnalysisCache;

// Bump a version whenever the cached shape for that kind changes
const SENTIMENT_SCHEMA: u32 = 2;
const EMOTION_SCHEMA: u32 = 1;
const ASPECTS_SCHEMA: u32 = 1;

/// Sentiment, emotion and the risk verdict derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub sentiment: ClassificationResult<Sentiment>,
    pub emotion: ClassificationResult<Emotion>,
    pub risk: RiskVerdict,
}

/// One successfully analyzed bulk item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub text: String,
    pub sentiment: ClassificationResult<Sentiment>,
    pub emotion: ClassificationResult<Emotion>,
}

/// Outcome of a bulk run; failed items are counted and omitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkReport {
    pub results: Vec<BulkItem>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Entry point for every analysis operation
pub struct AnalysisService {
    sentiment: Arc<SentimentAdapter>,
    emotion: Arc<EmotionAdapter>,
    risk: RiskEngine,
    aspects: AspectPipeline,
    cache: Arc<dyn AnalysisCache>,
    ttl: Duration,
    bulk_concurrency: usize,
}

impl AnalysisService {
    pub fn new(
        sentiment: Arc<SentimentAdapter>,
        emotion: Arc<EmotionAdapter>,
        risk: RiskEngine,
        aspects: AspectPipeline,
        cache: Arc<dyn AnalysisCache>,
    ) -> Self {
        Self {
            sentiment,
            emotion,
            risk,
            aspects,
            cache,
            ttl: Duration::from_secs(3600),
            bulk_concurrency: 4,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency.max(1);
        self
    }

    pub fn risk_engine(&self) -> &RiskEngine {
        &self.risk
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub async fn analyze_sentiment(&self, text: &str) -> Result<ClassificationResult<Sentiment>> {
        let text = non_empty(text)?;
        self.cached("sentiment", SENTIMENT_SCHEMA, text, || {
            self.sentiment.classify(text)
        })
        .await
    }

    pub async fn analyze_emotion(&self, text: &str) -> Result<ClassificationResult<Emotion>> {
        let text = non_empty(text)?;
        self.cached("emotion", EMOTION_SCHEMA, text, || self.emotion.classify(text))
            .await
    }

    /// Sentiment and emotion concurrently, then the risk verdict over both
    pub async fn analyze(&self, text: &str) -> Result<FullAnalysis> {
        let text = non_empty(text)?;
        let (sentiment, emotion) =
            tokio::try_join!(self.analyze_sentiment(text), self.analyze_emotion(text))?;

        let risk = self.risk.detect_risks(
            text,
            sentiment.label,
            emotion.label,
            Some(&sentiment.distribution),
        );
        for flag in risk.flags() {
            metrics::counter!("affectlens_risk_flags_total", "category" => flag.clone())
                .increment(1);
        }
        debug!(
            sentiment = %sentiment.label,
            emotion = %emotion.label,
            risk_level = %risk.risk_level(),
            "Analysis complete"
        );

        Ok(FullAnalysis {
            sentiment,
            emotion,
            risk,
        })
    }

    pub async fn analyze_aspects(&self, text: &str) -> Result<AspectAnalysis> {
        let text = non_empty(text)?;
        self.cached("aspects", ASPECTS_SCHEMA, text, || {
            self.aspects.analyze_aspects(text)
        })
        .await
    }

    /// Sentiment and emotion for each text, in input order.
    ///
    /// A failing item never aborts the batch.
    pub async fn analyze_bulk(&self, texts: &[String]) -> BulkReport {
        let outcomes: Vec<Result<BulkItem>> = stream::iter(texts.iter().cloned())
            .map(|text| async move {
                let (sentiment, emotion) = tokio::try_join!(
                    self.analyze_sentiment(&text),
                    self.analyze_emotion(&text)
                )?;
                Ok::<_, Error>(BulkItem {
                    text,
                    sentiment,
                    emotion,
                })
            })
            .buffered(self.bulk_concurrency)
            .collect()
            .await;

        let total = outcomes.len();
        let mut results = Vec::with_capacity(total);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(item) => results.push(item),
                Err(e) => warn!(index, error = %e, "Bulk item failed"),
            }
        }

        let successful = results.len();
        let failed = total - successful;
        metrics::counter!("affectlens_bulk_items_total", "outcome" => "success")
            .increment(successful as u64);
        metrics::counter!("affectlens_bulk_items_total", "outcome" => "failure")
            .increment(failed as u64);

        BulkReport {
            results,
            total,
            successful,
            failed,
        }
    }

    /// Look up `kind` for `text`, computing and storing it on a miss.
    ///
    /// Cache failures are logged and treated as misses.
    async fn cached<T, F, Fut>(
        &self,
        kind: &'static str,
        schema: u32,
        text: &str,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = content_key(kind, schema, text);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    metrics::counter!("affectlens_cache_hits_total", "kind" => kind).increment(1);
                    return Ok(value);
                }
                Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed"),
        }
        metrics::counter!("affectlens_cache_misses_total", "kind" => kind).increment(1);

        let value = compute().await?;

        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, bytes, self.ttl).await {
                    warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize result for cache"),
        }

        Ok(value)
    }
}

fn non_empty(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("text must not be empty"));
    }
    Ok(trimmed)
}
