//! Keyword lexicon provider
//!
//! This is a deterministic provider used when no remote model is configured,
//! and as the substitute when a remote model is unreachable at startup.

use affectlens_core::{Emotion, LabelSet, Result, Sentiment};
use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;

use crate::provider::{InferenceProvider, LabelScores};

/// Additive smoothing applied to every label
const SMOOTHING: f64 = 0.5;

/// Extra prior mass on the neutral label
const NEUTRAL_PRIOR: f64 = 1.0;

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "love", "loved", "amazing", "wonderful", "happy", "fantastic",
    "awesome", "best", "beautiful", "delighted", "enjoy", "enjoyed", "glad", "nice", "perfect",
    "pleased", "recommend", "superb", "thank", "thanks",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "hate", "horrible", "worst", "sad", "angry", "disappointed",
    "poor", "broken", "useless", "worthless", "hopeless", "disgusting", "rude", "slow",
    "ugly", "painful", "miserable", "annoying", "fail", "failed",
];

const NONE: &[&str] = &[];

const ANGER: &[&str] = &[
    "angry", "furious", "rage", "outraged", "annoyed", "annoying", "mad", "hate", "irritated",
    "fight",
];
const DISGUST: &[&str] = &[
    "disgusting", "gross", "revolting", "repulsive", "nasty", "vile", "sickening", "vermin",
];
const FEAR: &[&str] = &[
    "afraid", "scared", "terrified", "fear", "frightened", "worried", "anxious", "panic",
    "dangerous", "threat",
];
const JOY: &[&str] = &[
    "happy", "joy", "love", "great", "wonderful", "delighted", "excited", "glad", "beautiful",
    "fantastic", "amazing",
];
const SADNESS: &[&str] = &[
    "sad", "unhappy", "depressed", "lonely", "miserable", "cry", "crying", "hopeless",
    "empty", "grief", "heartbroken", "lost",
];
const SURPRISE: &[&str] = &[
    "surprised", "shocked", "unexpected", "astonished", "amazed", "wow", "sudden",
];

/// Keyword-count provider over a fixed label set
pub struct LexiconProvider {
    name: String,
    matcher: AhoCorasick,
    /// Label index for each pattern id
    pattern_labels: Vec<usize>,
    labels: Vec<&'static str>,
    neutral_index: Option<usize>,
}

impl LexiconProvider {
    /// Build from `(label, keywords)` groups. A group named `neutral` receives
    /// the neutral prior.
    pub fn new(
        name: impl Into<String>,
        groups: &[(&'static str, &[&'static str])],
    ) -> Result<Self> {
        let mut keywords = Vec::new();
        let mut pattern_labels = Vec::new();
        let mut labels = Vec::with_capacity(groups.len());

        for (index, (label, words)) in groups.iter().enumerate() {
            labels.push(*label);
            for word in words.iter() {
                keywords.push(*word);
                pattern_labels.push(index);
            }
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&keywords)
            .map_err(|e| {
                affectlens_core::Error::classifier(format!("Failed to build lexicon matcher: {e}"))
            })?;

        let neutral_index = labels.iter().position(|l| *l == "neutral");

        Ok(Self {
            name: name.into(),
            matcher,
            pattern_labels,
            labels,
            neutral_index,
        })
    }

    /// Three-class sentiment lexicon
    pub fn sentiment() -> Result<Self> {
        Self::new(
            "sentiment-lexicon",
            &[
                (Sentiment::Positive.as_str(), POSITIVE),
                (Sentiment::Neutral.as_str(), NONE),
                (Sentiment::Negative.as_str(), NEGATIVE),
            ],
        )
    }

    /// Seven-class emotion lexicon
    pub fn emotion() -> Result<Self> {
        Self::new(
            "emotion-lexicon",
            &[
                (Emotion::Anger.as_str(), ANGER),
                (Emotion::Disgust.as_str(), DISGUST),
                (Emotion::Fear.as_str(), FEAR),
                (Emotion::Joy.as_str(), JOY),
                (Emotion::Neutral.as_str(), NONE),
                (Emotion::Sadness.as_str(), SADNESS),
                (Emotion::Surprise.as_str(), SURPRISE),
            ],
        )
    }

    /// Whole-word hit counts per label
    fn hits(&self, text: &str) -> Vec<usize> {
        let bytes = text.as_bytes();
        let mut counts = vec![0; self.labels.len()];

        for m in self.matcher.find_iter(text) {
            let before_ok = m.start() == 0 || !is_word_byte(bytes[m.start() - 1]);
            let after_ok = m.end() == bytes.len() || !is_word_byte(bytes[m.end()]);
            if before_ok && after_ok {
                counts[self.pattern_labels[m.pattern().as_usize()]] += 1;
            }
        }

        counts
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[async_trait]
impl InferenceProvider for LexiconProvider {
    async fn infer(&self, text: &str) -> Result<LabelScores> {
        let hits = self.hits(text);

        let weights: Vec<f64> = hits
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let prior = if Some(i) == self.neutral_index {
                    NEUTRAL_PRIOR
                } else {
                    0.0
                };
                h as f64 + SMOOTHING + prior
            })
            .collect();
        let total: f64 = weights.iter().sum();

        Ok(self
            .labels
            .iter()
            .zip(weights)
            .map(|(label, w)| (label.to_string(), w / total))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}
