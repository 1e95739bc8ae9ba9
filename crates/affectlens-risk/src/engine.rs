//! Risk detection engine
//!
//! Fuses lexical category matches with classifier signals into a bounded
//! score. Every category and signal rule comes from the registry; the engine
//! itself has no per-category logic.

use affectlens_core::{Emotion, ProbabilityDistribution, Sentiment};
use std::sync::Arc;
use tracing::trace;

use crate::registry::CategoryRegistry;
use crate::verdict::RiskVerdict;

/// Deterministic risk scorer over a shared registry
#[derive(Debug, Clone)]
pub struct RiskEngine {
    registry: Arc<CategoryRegistry>,
}

impl RiskEngine {
    pub fn new(registry: Arc<CategoryRegistry>) -> Self {
        Self { registry }
    }

    /// Engine over the built-in table
    pub fn builtin() -> Result<Self, crate::RiskError> {
        Ok(Self::new(Arc::new(CategoryRegistry::builtin()?)))
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    /// Score `text` given the classifier outputs for it.
    ///
    /// When `sentiment_distribution` is absent, probability-gated signals see
    /// a negative probability of 0.0 and the negative-sentiment bonus falls
    /// back to its base value.
    pub fn detect_risks(
        &self,
        text: &str,
        sentiment: Sentiment,
        emotion: Emotion,
        sentiment_distribution: Option<&ProbabilityDistribution<Sentiment>>,
    ) -> RiskVerdict {
        let lowered = text.to_lowercase();
        let categories = self.registry.categories();
        let signals = self.registry.signals();

        let mut counts = Vec::with_capacity(categories.len());
        let mut flagged: Vec<usize> = Vec::new();
        let mut score = 0.0;

        for (index, category) in categories.iter().enumerate() {
            let matches = category.count_matches(&lowered);
            counts.push(matches);
            if matches >= category.min_matches() {
                flagged.push(index);
                score += matches as f64 * category.weight();
            }
        }

        let negative_probability =
            sentiment_distribution.map(|dist| dist.get(Sentiment::Negative));

        if sentiment == Sentiment::Negative {
            score += signals.negative_sentiment.bonus_for(negative_probability);
        }

        if signals.high_risk_emotions.contains(&emotion) {
            score += signals.emotion_bonus;
        }

        for rule in &signals.cross_rules {
            if !rule.labels_match(sentiment, emotion, negative_probability.unwrap_or(0.0)) {
                continue;
            }

            if let Some(required) = &rule.requires_matches_of {
                let present = self
                    .registry
                    .index_of(required)
                    .map(|i| counts[i] > 0)
                    .unwrap_or(false);
                if !present {
                    continue;
                }
            }

            match rule.ensure_flag.as_deref().and_then(|n| self.registry.index_of(n)) {
                Some(index) if flagged.contains(&index) => {}
                Some(index) => {
                    flagged.push(index);
                    score += rule.bonus;
                }
                None => score += rule.bonus,
            }

            trace!(rule = %rule.name, "Cross-signal rule applied");
        }

        let recommendations = self.recommendations(&flagged);
        let flags: Vec<String> = flagged
            .iter()
            .map(|&i| categories[i].name().to_string())
            .collect();

        let verdict = RiskVerdict::new(score, flags, recommendations);
        trace!(
            score = verdict.risk_score(),
            level = %verdict.risk_level(),
            flags = verdict.flags().len(),
            "Risk detection complete"
        );
        verdict
    }

    fn recommendations(&self, flagged: &[usize]) -> Vec<String> {
        if flagged.is_empty() {
            return vec![self.registry.safe_message().to_string()];
        }

        let categories = self.registry.categories();
        let mut ordered = flagged.to_vec();
        ordered.sort_by_key(|&i| categories[i].priority());

        ordered
            .into_iter()
            .flat_map(|i| categories[i].recommendations().iter().cloned())
            .collect()
    }
}
