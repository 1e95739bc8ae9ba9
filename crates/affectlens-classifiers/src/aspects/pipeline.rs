//! Aspect-level sentiment and overall aggregation

use affectlens_core::{ClassificationResult, ProbabilityDistribution, Result, Sentiment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::annotator::{Annotation, Annotator, BasicAnnotator};
use super::extract::{aspect_context, extract_aspects, Aspect};
use crate::adapter::SentimentAdapter;
use crate::config::AspectConfig;

/// Message attached to the empty result
pub const NO_ASPECTS_MESSAGE: &str = "No aspects found in the text";

/// Sentiment for a single aspect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectVerdict {
    pub aspect: Aspect,
    pub sentiment: ClassificationResult<Sentiment>,
    pub confidence: f64,
    pub context: String,
}

/// Confidence-weighted sentiment across all aspects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub label: Sentiment,
    pub confidence: f64,
    pub distribution: ProbabilityDistribution<Sentiment>,
}

impl OverallSentiment {
    /// Placeholder reported when there is nothing to aggregate
    pub fn no_aspects() -> Result<Self> {
        Ok(Self {
            label: Sentiment::Neutral,
            confidence: 0.0,
            distribution: ProbabilityDistribution::new([
                (Sentiment::Positive, 0.33),
                (Sentiment::Neutral, 0.34),
                (Sentiment::Negative, 0.33),
            ])?,
        })
    }
}

/// Outcome of aspect analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AspectAnalysis {
    Found {
        aspects: Vec<AspectVerdict>,
        overall: OverallSentiment,
    },
    NoAspects,
}

impl AspectAnalysis {
    pub fn aspects(&self) -> &[AspectVerdict] {
        match self {
            Self::Found { aspects, .. } => aspects,
            Self::NoAspects => &[],
        }
    }
}

/// Aggregate per-aspect results.
///
/// Each aspect is weighted by its share of the summed confidence (uniform
/// when the sum is zero). Returns `None` for an empty slice.
pub fn aggregate_overall(
    verdicts: &[AspectVerdict],
    margin: f64,
) -> Result<Option<OverallSentiment>> {
    if verdicts.is_empty() {
        return Ok(None);
    }

    let total: f64 = verdicts.iter().map(|v| v.confidence).sum();
    let uniform = 1.0 / verdicts.len() as f64;

    let mut positive = 0.0;
    let mut neutral = 0.0;
    let mut negative = 0.0;
    for verdict in verdicts {
        let weight = if total > 0.0 {
            verdict.confidence / total
        } else {
            uniform
        };
        let dist = &verdict.sentiment.distribution;
        positive += dist.get(Sentiment::Positive) * weight;
        neutral += dist.get(Sentiment::Neutral) * weight;
        negative += dist.get(Sentiment::Negative) * weight;
    }

    let distribution = ProbabilityDistribution::new([
        (Sentiment::Positive, positive),
        (Sentiment::Neutral, neutral),
        (Sentiment::Negative, negative),
    ])?;
    let label = Sentiment::resolve(&distribution, margin);
    let confidence = distribution.get(label);

    Ok(Some(OverallSentiment {
        label,
        confidence,
        distribution,
    }))
}

/// Extracts aspects and scores each one in context
pub struct AspectPipeline {
    annotator: Arc<dyn Annotator>,
    sentiment: Arc<SentimentAdapter>,
    config: AspectConfig,
}

impl AspectPipeline {
    pub fn new(
        annotator: Arc<dyn Annotator>,
        sentiment: Arc<SentimentAdapter>,
        config: AspectConfig,
    ) -> Self {
        Self {
            annotator,
            sentiment,
            config,
        }
    }

    /// Annotate, falling back to the basic annotator when the configured one
    /// is unavailable
    fn annotate(&self, text: &str) -> Result<Annotation> {
        match self.annotator.annotate(text) {
            Ok(annotation) => Ok(annotation),
            Err(e) if e.is_dependency_unavailable() => {
                warn!(
                    annotator = self.annotator.name(),
                    error = %e,
                    "Annotator unavailable, using basic tokenizer"
                );
                BasicAnnotator::new().annotate(text)
            }
            Err(e) => Err(e),
        }
    }

    pub fn extract_aspects(&self, text: &str) -> Result<Vec<Aspect>> {
        let annotation = self.annotate(text)?;
        Ok(extract_aspects(text, &annotation, self.config.max_aspects))
    }

    /// Score every aspect and aggregate an overall sentiment
    pub async fn analyze_aspects(&self, text: &str) -> Result<AspectAnalysis> {
        let annotation = self.annotate(text)?;
        let aspects = extract_aspects(text, &annotation, self.config.max_aspects);

        if aspects.is_empty() {
            debug!("No aspects found");
            return Ok(AspectAnalysis::NoAspects);
        }

        let mut verdicts = Vec::with_capacity(aspects.len());
        for aspect in aspects {
            let context = aspect_context(
                text,
                &aspect,
                &annotation.sentences,
                self.config.context_window,
            );
            let prompt = format!("{}: {}", aspect.text, context);
            let sentiment = self.sentiment.classify(&prompt).await?;
            let confidence = sentiment.confidence();

            verdicts.push(AspectVerdict {
                aspect,
                sentiment,
                confidence,
                context,
            });
        }

        match aggregate_overall(&verdicts, self.config.neutral_margin)? {
            Some(overall) => Ok(AspectAnalysis::Found {
                aspects: verdicts,
                overall,
            }),
            None => Ok(AspectAnalysis::NoAspects),
        }
    }
}
