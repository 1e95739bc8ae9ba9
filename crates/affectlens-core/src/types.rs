//! Core types for affectlens

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};

/// How far a distribution may drift from summing to 1.0.
pub const DISTRIBUTION_TOLERANCE: f64 = 0.01;

/// Margin under which positive and negative mass are considered tied.
pub const NEUTRAL_MARGIN: f64 = 0.15;

/// A closed, ordered set of classifier labels.
///
/// `ALL` fixes the iteration order, which is also the tie-break order for
/// [`ProbabilityDistribution::argmax`].
pub trait LabelSet:
    Copy + Eq + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every label, in canonical order
    const ALL: &'static [Self];

    /// Lowercase wire name
    fn as_str(&self) -> &'static str;

    /// Parse a provider label (case-insensitive, surrounding whitespace ignored)
    fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|l| l.as_str() == label)
    }
}

/// Three-class sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl LabelSet for Sentiment {
    const ALL: &'static [Self] = &[Self::Positive, Self::Neutral, Self::Negative];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl Sentiment {
    /// Pick a label, forcing `Neutral` when positive and negative mass are
    /// within `margin` of each other.
    pub fn resolve(distribution: &ProbabilityDistribution<Sentiment>, margin: f64) -> Self {
        let positive = distribution.get(Self::Positive);
        let negative = distribution.get(Self::Negative);

        if (positive - negative).abs() < margin {
            return Self::Neutral;
        }

        distribution
            .argmax()
            .map(|(label, _)| label)
            .unwrap_or(Self::Neutral)
    }
}

/// Seven-class emotion label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl LabelSet for Emotion {
    const ALL: &'static [Self] = &[
        Self::Anger,
        Self::Disgust,
        Self::Fear,
        Self::Joy,
        Self::Neutral,
        Self::Sadness,
        Self::Surprise,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Neutral => "neutral",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
        }
    }
}

macro_rules! impl_display_for_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_for_label!(Sentiment, Emotion);

/// Probability mass over a closed label set.
///
/// Missing labels read as 0.0. Construction validates that every value is a
/// finite probability and that the total is within [`DISTRIBUTION_TOLERANCE`]
/// of 1.0; deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution<L: LabelSet> {
    probs: BTreeMap<L, f64>,
}

impl<L: LabelSet> ProbabilityDistribution<L> {
    /// Build a validated distribution
    pub fn new(probs: impl IntoIterator<Item = (L, f64)>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (label, p) in probs {
            if !p.is_finite() || !(0.0..=1.0 + DISTRIBUTION_TOLERANCE).contains(&p) {
                return Err(Error::classifier(format!(
                    "probability for '{}' out of range: {}",
                    label.as_str(),
                    p
                )));
            }
            map.insert(label, p.min(1.0));
        }

        let total: f64 = map.values().sum();
        if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(Error::classifier(format!(
                "distribution does not sum to 1.0 (sum = {:.4})",
                total
            )));
        }

        Ok(Self { probs: map })
    }

    /// Normalize non-negative weights into a distribution.
    ///
    /// All-zero weights produce a uniform distribution over `L::ALL`.
    pub fn from_weights(weights: impl IntoIterator<Item = (L, f64)>) -> Result<Self> {
        let weights: Vec<(L, f64)> = weights
            .into_iter()
            .map(|(l, w)| (l, if w.is_finite() { w.max(0.0) } else { 0.0 }))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();

        if total <= 0.0 {
            let p = 1.0 / L::ALL.len() as f64;
            return Self::new(L::ALL.iter().map(|l| (*l, p)));
        }

        Self::new(weights.into_iter().map(|(l, w)| (l, w / total)))
    }

    /// Probability for `label`, 0.0 when absent
    pub fn get(&self, label: L) -> f64 {
        self.probs.get(&label).copied().unwrap_or(0.0)
    }

    /// Highest-probability label; ties resolve to the earliest label in `L::ALL`
    pub fn argmax(&self) -> Option<(L, f64)> {
        let mut best: Option<(L, f64)> = None;
        for label in L::ALL {
            let Some(p) = self.probs.get(label).copied() else {
                continue;
            };
            match best {
                Some((_, bp)) if bp >= p => {}
                _ => best = Some((*label, p)),
            }
        }
        best
    }

    /// The largest probability in the distribution (0.0 when empty)
    pub fn max_probability(&self) -> f64 {
        self.probs.values().copied().fold(0.0, f64::max)
    }

    /// Iterate over labels present in the distribution, in label order
    pub fn iter(&self) -> impl Iterator<Item = (L, f64)> + '_ {
        self.probs.iter().map(|(l, p)| (*l, *p))
    }

    /// Every label in `L::ALL` with missing entries filled as 0.0
    pub fn dense(&self) -> Vec<(L, f64)> {
        L::ALL.iter().map(|l| (*l, self.get(*l))).collect()
    }
}

impl<L: LabelSet> Serialize for ProbabilityDistribution<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.probs.serialize(serializer)
    }
}

impl<'de, L: LabelSet> Deserialize<'de> for ProbabilityDistribution<L> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let probs = BTreeMap::<L, f64>::deserialize(deserializer)?;
        Self::new(probs).map_err(serde::de::Error::custom)
    }
}

/// A label together with the distribution it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct ClassificationResult<L: LabelSet> {
    /// Chosen label
    pub label: L,

    /// Full distribution over the label set
    pub distribution: ProbabilityDistribution<L>,
}

impl<L: LabelSet> ClassificationResult<L> {
    /// Pair a label with its distribution
    pub fn new(label: L, distribution: ProbabilityDistribution<L>) -> Self {
        Self {
            label,
            distribution,
        }
    }

    /// Confidence = the largest probability in the distribution
    pub fn confidence(&self) -> f64 {
        self.distribution.max_probability()
    }
}

/// Service readiness as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Collaborators are still being constructed
    Loading,
    /// Serving with a substituted fallback (e.g. lexicon instead of a model)
    Degraded,
    /// All configured collaborators are available
    Ready,
}

impl Readiness {
    /// Whether requests can be served in this state
    pub fn is_serving(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentiment(pos: f64, neu: f64, neg: f64) -> ProbabilityDistribution<Sentiment> {
        ProbabilityDistribution::new([
            (Sentiment::Positive, pos),
            (Sentiment::Neutral, neu),
            (Sentiment::Negative, neg),
        ])
        .unwrap()
    }

    #[test]
    fn test_classification_result_serde() {
        let result = ClassificationResult::new(Sentiment::Negative, sentiment(0.1, 0.2, 0.7));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"label\":\"negative\""));

        let parsed: ClassificationResult<Sentiment> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_missing_label_reads_zero() {
        let dist = ProbabilityDistribution::new([(Sentiment::Positive, 1.0)]).unwrap();
        assert_eq!(dist.get(Sentiment::Negative), 0.0);
        assert_eq!(dist.dense().len(), 3);
    }

    #[test]
    fn test_rejects_bad_distribution() {
        assert!(ProbabilityDistribution::new([(Sentiment::Positive, 0.5)]).is_err());
        assert!(ProbabilityDistribution::new([
            (Sentiment::Positive, f64::NAN),
            (Sentiment::Negative, 1.0),
        ])
        .is_err());
        assert!(ProbabilityDistribution::new([
            (Sentiment::Positive, -0.2),
            (Sentiment::Negative, 1.2),
        ])
        .is_err());
    }

    #[test]
    fn test_from_weights_normalizes() {
        let dist =
            ProbabilityDistribution::from_weights([(Emotion::Joy, 3.0), (Emotion::Fear, 1.0)])
                .unwrap();
        assert!((dist.get(Emotion::Joy) - 0.75).abs() < 1e-9);

        let uniform = ProbabilityDistribution::<Emotion>::from_weights([]).unwrap();
        assert!((uniform.get(Emotion::Surprise) - 1.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_tie_break() {
        // Negative is close to positive: forced neutral
        let dist = sentiment(0.48, 0.07, 0.45);
        assert_eq!(Sentiment::resolve(&dist, NEUTRAL_MARGIN), Sentiment::Neutral);

        let dist = sentiment(0.10, 0.15, 0.75);
        assert_eq!(Sentiment::resolve(&dist, NEUTRAL_MARGIN), Sentiment::Negative);
    }

    #[test]
    fn test_argmax_tie_uses_label_order() {
        let dist = ProbabilityDistribution::new([(Emotion::Sadness, 0.5), (Emotion::Anger, 0.5)])
            .unwrap();
        assert_eq!(dist.argmax().unwrap().0, Emotion::Anger);
    }

    #[test]
    fn test_distribution_serde() {
        let dist = sentiment(0.7, 0.2, 0.1);
        let json = serde_json::to_string(&dist).unwrap();
        assert!(json.contains("\"positive\":0.7"));

        let back: ProbabilityDistribution<Sentiment> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dist);

        let bad = r#"{"positive": 0.9, "negative": 0.9}"#;
        assert!(serde_json::from_str::<ProbabilityDistribution<Sentiment>>(bad).is_err());
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(Sentiment::parse(" Negative "), Some(Sentiment::Negative));
        assert_eq!(Emotion::parse("JOY"), Some(Emotion::Joy));
        assert_eq!(Emotion::parse("love"), None);
    }
}
