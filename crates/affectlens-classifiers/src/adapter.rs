//! Classifier adapters
//!
//! Adapters sit between a raw [`InferenceProvider`] and the typed results the
//! rest of the service consumes: they truncate input, map provider labels onto
//! a closed label set, validate the distribution and choose a label.

use affectlens_core::{
    ClassificationResult, Emotion, Error, LabelSet, ProbabilityDistribution, Result, Sentiment,
};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::provider::{InferenceProvider, LabelScores};

/// Truncate to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Maps provider output onto a label set `L`
pub struct LabelAdapter<L: LabelSet> {
    provider: Arc<dyn InferenceProvider>,
    aliases: HashMap<String, String>,
    max_chars: usize,
    _labels: PhantomData<L>,
}

impl<L: LabelSet> LabelAdapter<L> {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        aliases: HashMap<String, String>,
        max_chars: usize,
    ) -> Self {
        // Alias keys are matched case-insensitively
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            provider,
            aliases,
            max_chars,
            _labels: PhantomData,
        }
    }

    pub fn provider(&self) -> &Arc<dyn InferenceProvider> {
        &self.provider
    }

    /// Run the provider and build a validated distribution
    pub async fn distribution(&self, text: &str) -> Result<ProbabilityDistribution<L>> {
        let input = truncate_chars(text, self.max_chars);
        let start = Instant::now();
        let scores = self.provider.infer(input).await?;

        metrics::histogram!(
            "affectlens_inference_latency_us",
            "provider" => self.provider.name().to_string()
        )
        .record(start.elapsed().as_micros() as f64);

        self.map_scores(scores)
    }

    /// Fold provider scores into `L`.
    ///
    /// Mass on labels outside the set is dropped and the rest renormalized.
    fn map_scores(&self, scores: LabelScores) -> Result<ProbabilityDistribution<L>> {
        let mut mapped: BTreeMap<L, f64> = BTreeMap::new();
        let mut dropped: Vec<String> = Vec::new();
        let mut dropped_mass = 0.0;

        for (raw, score) in scores {
            let key = raw.trim().to_lowercase();
            let name = self.aliases.get(&key).map(String::as_str).unwrap_or(&key);
            match L::parse(name) {
                Some(label) => *mapped.entry(label).or_insert(0.0) += score,
                None => {
                    if score.is_finite() {
                        dropped_mass += score.max(0.0);
                    }
                    dropped.push(raw);
                }
            }
        }

        if mapped.is_empty() {
            return Err(Error::classifier(format!(
                "provider {} returned no recognised labels",
                self.provider.name()
            )));
        }

        if dropped_mass > 0.0 {
            warn!(
                provider = self.provider.name(),
                labels = ?dropped,
                mass = dropped_mass,
                "Dropped score mass on labels outside the label set"
            );
        } else if !dropped.is_empty() {
            debug!(
                provider = self.provider.name(),
                labels = ?dropped,
                "Ignoring labels outside the label set"
            );
        }

        ProbabilityDistribution::from_weights(mapped)
    }
}

/// Three-class sentiment with the neutral tie-break
pub struct SentimentAdapter {
    inner: LabelAdapter<Sentiment>,
    margin: f64,
}

impl SentimentAdapter {
    pub fn new(inner: LabelAdapter<Sentiment>, margin: f64) -> Self {
        Self { inner, margin }
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider().name()
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult<Sentiment>> {
        let distribution = self.inner.distribution(text).await?;
        let label = Sentiment::resolve(&distribution, self.margin);
        Ok(ClassificationResult::new(label, distribution))
    }
}

/// Seven-class emotion, highest probability wins
pub struct EmotionAdapter {
    inner: LabelAdapter<Emotion>,
}

impl EmotionAdapter {
    pub fn new(inner: LabelAdapter<Emotion>) -> Self {
        Self { inner }
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider().name()
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult<Emotion>> {
        let distribution = self.inner.distribution(text).await?;
        let (label, _) = distribution
            .argmax()
            .ok_or_else(|| Error::classifier("empty emotion distribution"))?;
        Ok(ClassificationResult::new(label, distribution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedProvider {
        scores: LabelScores,
        seen: Mutex<Vec<String>>,
    }

    impl FixedProvider {
        fn new(scores: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self {
                scores: scores.iter().map(|(l, s)| (l.to_string(), *s)).collect(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for FixedProvider {
        async fn infer(&self, text: &str) -> Result<LabelScores> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.scores.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[tokio::test]
    async fn test_sentiment_tie_break() {
        let provider = FixedProvider::new(&[
            ("positive", 0.48),
            ("neutral", 0.07),
            ("negative", 0.45),
        ]);
        let adapter = SentimentAdapter::new(
            LabelAdapter::new(provider, HashMap::new(), 2000),
            affectlens_core::NEUTRAL_MARGIN,
        );

        let result = adapter.classify("mixed feelings").await.unwrap();
        assert_eq!(result.label, Sentiment::Neutral);
        assert!((result.confidence() - 0.48).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_label_aliases_and_truncation() {
        let provider = FixedProvider::new(&[
            ("LABEL_0", 0.8),
            ("LABEL_1", 0.15),
            ("LABEL_2", 0.05),
        ]);
        let aliases = HashMap::from([
            ("LABEL_0".to_string(), "negative".to_string()),
            ("LABEL_1".to_string(), "neutral".to_string()),
            ("LABEL_2".to_string(), "positive".to_string()),
        ]);
        let adapter = SentimentAdapter::new(
            LabelAdapter::new(provider.clone(), aliases, 5),
            affectlens_core::NEUTRAL_MARGIN,
        );

        let result = adapter.classify("terrible service").await.unwrap();
        assert_eq!(result.label, Sentiment::Negative);
        assert_eq!(provider.seen.lock().unwrap()[0], "terri");
    }

    #[tokio::test]
    async fn test_emotion_renormalizes_out_of_set_mass() {
        // Six-class model: "love" has no counterpart in the label set
        let provider = FixedProvider::new(&[
            ("sadness", 0.5),
            ("joy", 0.1),
            ("love", 0.3),
            ("anger", 0.05),
            ("fear", 0.03),
            ("surprise", 0.02),
        ]);
        let adapter = EmotionAdapter::new(LabelAdapter::new(provider, HashMap::new(), 2000));

        let result = adapter.classify("I miss them").await.unwrap();
        assert_eq!(result.label, Emotion::Sadness);
        assert!((result.distribution.get(Emotion::Sadness) - 0.5 / 0.7).abs() < 1e-9);
        assert_eq!(result.distribution.get(Emotion::Disgust), 0.0);

        let total: f64 = result.distribution.dense().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unrecognised_labels_error() {
        let provider = FixedProvider::new(&[("LABEL_0", 1.0)]);
        let adapter = EmotionAdapter::new(LabelAdapter::new(provider, HashMap::new(), 2000));

        let err = adapter.classify("x").await.unwrap_err();
        assert!(matches!(err, Error::Classifier(_)));
    }
}
