//! Scenario tests for the built-in risk table

use affectlens_core::{Emotion, ProbabilityDistribution, Sentiment};
use affectlens_risk::{RiskEngine, RiskLevel};

fn engine() -> RiskEngine {
    RiskEngine::builtin().expect("built-in table must compile")
}

#[test]
fn test_nuclear_threat_detection() {
    let verdict = engine().detect_risks(
        "The nuclear threshold has been met according to intelligence reports.",
        Sentiment::Negative,
        Emotion::Fear,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("nuclear_threat"));
    assert!(matches!(
        verdict.risk_level(),
        RiskLevel::Medium | RiskLevel::High
    ));
}

#[test]
fn test_conflict_escalation_detection() {
    let verdict = engine().detect_risks(
        "If they keep pushing us, we'll take to the streets and fight back.",
        Sentiment::Negative,
        Emotion::Anger,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("conflict_escalation"));
    assert!(verdict.risk_score() > 0.3);
}

#[test]
fn test_war_conflict_detection() {
    let verdict = engine().detect_risks(
        "Military mobilization has begun with troops deploying to the border.",
        Sentiment::Negative,
        Emotion::Fear,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("war_conflict"));
}

#[test]
fn test_self_harm_detection() {
    let verdict = engine().detect_risks(
        "I can't see a way out anymore and feel like ending it all.",
        Sentiment::Negative,
        Emotion::Sadness,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("self_harm"));
    assert_eq!(verdict.risk_level(), RiskLevel::High);
    assert!(verdict
        .recommendations()
        .iter()
        .any(|r| r.contains("URGENT")));
}

#[test]
fn test_violence_detection() {
    let verdict = engine().detect_risks(
        "These people are vermin and need to be eliminated from society.",
        Sentiment::Negative,
        Emotion::Disgust,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("violence_threat"));
}

#[test]
fn test_cyberbullying_detection() {
    let verdict = engine().detect_risks(
        "You're worthless and nobody cares about you, just give up.",
        Sentiment::Negative,
        Emotion::Disgust,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("cyberbullying"));
}

#[test]
fn test_mental_health_detection() {
    let verdict = engine().detect_risks(
        "I feel empty inside and can't connect with anyone anymore.",
        Sentiment::Negative,
        Emotion::Sadness,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("mental_health_distress"));
}

#[test]
fn test_positive_text_no_risk() {
    let verdict = engine().detect_risks(
        "I love this beautiful day and feel great about everything!",
        Sentiment::Positive,
        Emotion::Joy,
        None,
    );

    assert!(!verdict.has_risk());
    assert!(verdict.flags().is_empty());
    assert_eq!(verdict.risk_level(), RiskLevel::Low);
}

#[test]
fn test_neutral_text_no_risk() {
    let verdict = engine().detect_risks(
        "The meeting is scheduled for tomorrow at 3 PM.",
        Sentiment::Neutral,
        Emotion::Neutral,
        None,
    );

    assert!(!verdict.has_risk());
    assert!(verdict.risk_score() < 0.3);
}

#[test]
fn test_multiple_risk_categories() {
    let verdict = engine().detect_risks(
        "Nuclear war is coming and we must take to the streets to fight back.",
        Sentiment::Negative,
        Emotion::Anger,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.flags().len() >= 2);
    assert!(verdict.is_flagged("nuclear_threat"));
    assert_eq!(verdict.risk_level(), RiskLevel::High);
    // Detection order follows the table
    assert_eq!(verdict.flags()[0], "nuclear_threat");
}

#[test]
fn test_risk_score_bounds() {
    let verdict = engine().detect_risks(
        "This is a minor disagreement.",
        Sentiment::Neutral,
        Emotion::Neutral,
        None,
    );

    assert!((0.0..=1.0).contains(&verdict.risk_score()));
}

#[test]
fn test_recommendations_generated() {
    let verdict = engine().detect_risks(
        "Nuclear strike imminent, prepare for war.",
        Sentiment::Negative,
        Emotion::Fear,
        None,
    );

    assert!(verdict.has_risk());
    assert!(!verdict.recommendations().is_empty());
    assert!(verdict
        .recommendations()
        .iter()
        .any(|r| r.contains("CRITICAL")));
}

#[test]
fn test_recommendations_follow_priority_not_detection_order() {
    // violence_threat is detected before cyberbullying and self_harm is
    // detected after violence, but self_harm has the higher priority.
    let verdict = engine().detect_risks(
        "I want to die, they hate me and want to hurt me.",
        Sentiment::Negative,
        Emotion::Sadness,
        None,
    );

    assert!(verdict.is_flagged("violence_threat"));
    assert!(verdict.is_flagged("self_harm"));
    assert!(verdict.is_flagged("cyberbullying"));

    let recs = verdict.recommendations();
    let pos = |needle: &str| recs.iter().position(|r| r.contains(needle)).unwrap();
    assert!(pos("URGENT") < pos("Violence/threat"));
    assert!(pos("Violence/threat") < pos("Cyberbullying"));
}

#[test]
fn test_terrorism_detection() {
    let verdict = engine().detect_risks(
        "Radicalization efforts targeting vulnerable youth online.",
        Sentiment::Negative,
        Emotion::Anger,
        None,
    );

    assert!(verdict.has_risk());
    assert!(verdict.is_flagged("terrorism_extremism"));
}

#[test]
fn test_sentiment_modifier() {
    let dist = ProbabilityDistribution::new([
        (Sentiment::Negative, 0.9),
        (Sentiment::Positive, 0.05),
        (Sentiment::Neutral, 0.05),
    ])
    .unwrap();

    let verdict = engine().detect_risks(
        "This situation is terrible and dangerous.",
        Sentiment::Negative,
        Emotion::Fear,
        Some(&dist),
    );

    assert!(verdict.risk_score() > 0.2);
}

#[test]
fn test_anger_rule_does_not_duplicate_violence_flag() {
    let verdict = engine().detect_risks(
        "I will hurt you.",
        Sentiment::Negative,
        Emotion::Anger,
        None,
    );

    let violence = verdict
        .flags()
        .iter()
        .filter(|f| *f == "violence_threat")
        .count();
    assert_eq!(violence, 1);
    // 0.35 violence + 0.1 negative + 0.2 anger, no cross bonus
    assert!((verdict.risk_score() - 0.65).abs() < 1e-9);
}

#[test]
fn test_model_only_signal_has_no_flag() {
    let dist = ProbabilityDistribution::new([
        (Sentiment::Negative, 0.95),
        (Sentiment::Positive, 0.02),
        (Sentiment::Neutral, 0.03),
    ])
    .unwrap();

    let verdict = engine().detect_risks(
        "The train left the station.",
        Sentiment::Negative,
        Emotion::Fear,
        Some(&dist),
    );

    // 0.25 + 0.2 crosses the medium threshold without any category
    assert!(!verdict.has_risk());
    assert!(verdict.flags().is_empty());
    assert_eq!(verdict.risk_level(), RiskLevel::Medium);
}
