//! Model-signal adjustments
//!
//! Bonuses derived from classifier outputs rather than lexical matches. They
//! are additive and apply whether or not any pattern matched.

use affectlens_core::{Emotion, Sentiment};
use serde::{Deserialize, Serialize};

/// All model-derived score adjustments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalTable {
    /// Bonus when the sentiment label is negative
    pub negative_sentiment: NegativeSentimentBonus,

    /// Emotions that add `emotion_bonus` on their own
    #[serde(default)]
    pub high_risk_emotions: Vec<Emotion>,

    #[serde(default)]
    pub emotion_bonus: f64,

    /// Emotion/sentiment combinations, each evaluated independently
    #[serde(default)]
    pub cross_rules: Vec<CrossRule>,
}

/// Tiered bonus scaled by negative-class probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegativeSentimentBonus {
    /// Checked in order; the first tier whose `above` is exceeded applies
    #[serde(default)]
    pub tiers: Vec<ConfidenceTier>,

    /// Applied when no tier matches or no distribution is available
    pub base_bonus: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceTier {
    pub above: f64,
    pub bonus: f64,
}

impl NegativeSentimentBonus {
    /// Bonus for a negative label given the negative probability, if known
    pub fn bonus_for(&self, negative_probability: Option<f64>) -> f64 {
        let Some(p) = negative_probability else {
            return self.base_bonus;
        };
        self.tiers
            .iter()
            .find(|tier| p > tier.above)
            .map(|tier| tier.bonus)
            .unwrap_or(self.base_bonus)
    }
}

/// A combined emotion + sentiment rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossRule {
    pub name: String,

    /// Required emotion label
    pub emotion: Emotion,

    /// Required sentiment label, if any
    #[serde(default)]
    pub sentiment: Option<Sentiment>,

    /// Negative probability must exceed this (0.0 when no distribution)
    #[serde(default)]
    pub min_negative_probability: Option<f64>,

    /// At least one pattern of this category must have matched
    #[serde(default)]
    pub requires_matches_of: Option<String>,

    /// Category to flag if not already present. When set, the bonus is only
    /// added if the flag is newly added; otherwise the bonus always applies.
    #[serde(default)]
    pub ensure_flag: Option<String>,

    pub bonus: f64,
}

impl CrossRule {
    /// Whether the label/probability preconditions hold.
    ///
    /// Pattern preconditions are checked by the engine, which owns the match
    /// counts.
    pub fn labels_match(
        &self,
        sentiment: Sentiment,
        emotion: Emotion,
        negative_probability: f64,
    ) -> bool {
        if self.emotion != emotion {
            return false;
        }
        if let Some(required) = self.sentiment {
            if required != sentiment {
                return false;
            }
        }
        match self.min_negative_probability {
            Some(min) => negative_probability > min,
            None => true,
        }
    }
}
