//! Property tests for risk verdict invariants

use affectlens_core::{Emotion, LabelSet, ProbabilityDistribution, Sentiment};
use affectlens_risk::{RiskEngine, RiskLevel};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::OnceLock;

fn engine() -> &'static RiskEngine {
    static ENGINE: OnceLock<RiskEngine> = OnceLock::new();
    ENGINE.get_or_init(|| RiskEngine::builtin().unwrap())
}

const VOCABULARY: &[&str] = &[
    "nuclear", "weapon", "war", "warm", "declare", "troop", "deployment", "kill", "hurt",
    "myself", "hopeless", "nothing", "never", "alone", "hate", "you're", "worthless", "fight",
    "back", "siege", "the", "a", "meeting", "happy", "day", "radical", "hostage", "empty",
    "inside", "revenge", "I", "want", "to", "die", "can't", "cope", "pathetic", "strike",
];

fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(prop::sample::select(VOCABULARY), 0..24)
            .prop_map(|words| words.join(" ")),
        ".{0,200}",
    ]
}

fn distribution_strategy() -> impl Strategy<Value = Option<ProbabilityDistribution<Sentiment>>> {
    prop::option::of((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0).prop_map(|(p, u, n)| {
        ProbabilityDistribution::from_weights([
            (Sentiment::Positive, p),
            (Sentiment::Neutral, u),
            (Sentiment::Negative, n),
        ])
        .unwrap()
    }))
}

proptest! {
    #[test]
    fn verdict_invariants_hold(
        text in text_strategy(),
        sentiment in prop::sample::select(Sentiment::ALL),
        emotion in prop::sample::select(Emotion::ALL),
        dist in distribution_strategy(),
    ) {
        let verdict = engine().detect_risks(&text, sentiment, emotion, dist.as_ref());

        let score = verdict.risk_score();
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(verdict.has_risk(), !verdict.flags().is_empty());
        prop_assert_eq!(verdict.risk_level(), RiskLevel::from_score(score));

        let unique: HashSet<_> = verdict.flags().iter().collect();
        prop_assert_eq!(unique.len(), verdict.flags().len());
        prop_assert!(!verdict.recommendations().is_empty());
    }

    #[test]
    fn detection_is_idempotent(
        text in text_strategy(),
        sentiment in prop::sample::select(Sentiment::ALL),
        emotion in prop::sample::select(Emotion::ALL),
    ) {
        let first = engine().detect_risks(&text, sentiment, emotion, None);
        let second = engine().detect_risks(&text, sentiment, emotion, None);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn case_does_not_change_verdict(
        words in prop::collection::vec(prop::sample::select(VOCABULARY), 0..24),
    ) {
        let text = words.join(" ");
        let lower = engine().detect_risks(&text, Sentiment::Neutral, Emotion::Neutral, None);
        let upper = engine().detect_risks(
            &text.to_uppercase(),
            Sentiment::Neutral,
            Emotion::Neutral,
            None,
        );
        prop_assert_eq!(lower.flags(), upper.flags());
    }
}
