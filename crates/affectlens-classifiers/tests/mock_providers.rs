//! Mock providers and annotators for testing
//!
//! Exercises the analysis facade (caching, risk fusion, bulk isolation) and
//! the aspect pipeline without any remote model.

use affectlens_classifiers::aspects::{AspectKind, Sentence, Token};
use affectlens_classifiers::{
    AnalysisCache, AnalysisService, Annotation, Annotator, AspectAnalysis, AspectConfig,
    AspectPipeline, BasicAnnotator, EmotionAdapter, InferenceProvider, LabelAdapter, LabelScores,
    MemoryCache, SentimentAdapter,
};
use affectlens_core::{Emotion, Error, Result, Sentiment, NEUTRAL_MARGIN};
use affectlens_risk::{RiskEngine, RiskLevel};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn scores(pairs: &[(&str, f64)]) -> LabelScores {
    pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
}

/// A configurable mock provider
pub struct MockProvider {
    name: String,
    default_scores: LabelScores,
    rules: Vec<(String, LabelScores)>,
    fail_on: Option<String>,
    call_count: AtomicU32,
}

impl MockProvider {
    pub fn new(name: &str, default_scores: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            default_scores: scores(default_scores),
            rules: Vec::new(),
            fail_on: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Return `scores` for inputs starting with `prefix`
    pub fn with_rule(mut self, prefix: &str, rule_scores: &[(&str, f64)]) -> Self {
        self.rules.push((prefix.to_string(), scores(rule_scores)));
        self
    }

    /// Fail with `ModelUnavailable` for inputs containing `marker`
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.to_string());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn infer(&self, text: &str) -> Result<LabelScores> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(Error::model_unavailable(&self.name, "simulated outage"));
            }
        }

        let matched = self
            .rules
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix.as_str()))
            .map(|(_, s)| s.clone());
        Ok(matched.unwrap_or_else(|| self.default_scores.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }
}

/// An annotator returning a fixed annotation
pub struct MockAnnotator {
    annotation: Annotation,
}

impl Annotator for MockAnnotator {
    fn annotate(&self, _text: &str) -> Result<Annotation> {
        Ok(self.annotation.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An annotator whose model never loaded
pub struct UnavailableAnnotator;

impl Annotator for UnavailableAnnotator {
    fn annotate(&self, _text: &str) -> Result<Annotation> {
        Err(Error::annotator("model not installed"))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// A cache whose backend is always down
pub struct BrokenCache;

#[async_trait]
impl AnalysisCache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::cache("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(Error::cache("connection refused"))
    }

    fn backend(&self) -> &'static str {
        "broken"
    }
}

fn negative_provider() -> MockProvider {
    MockProvider::new(
        "sentiment",
        &[("negative", 0.9), ("neutral", 0.05), ("positive", 0.05)],
    )
}

fn sad_provider() -> MockProvider {
    MockProvider::new("emotion", &[("sadness", 0.8), ("neutral", 0.2)])
}

fn service(
    sentiment: Arc<MockProvider>,
    emotion: Arc<MockProvider>,
    annotator: Arc<dyn Annotator>,
    cache: Arc<dyn AnalysisCache>,
) -> AnalysisService {
    let sentiment = Arc::new(SentimentAdapter::new(
        LabelAdapter::new(sentiment, HashMap::new(), 2000),
        NEUTRAL_MARGIN,
    ));
    let emotion = Arc::new(EmotionAdapter::new(LabelAdapter::new(
        emotion,
        HashMap::new(),
        2000,
    )));
    let aspects = AspectPipeline::new(annotator, sentiment.clone(), AspectConfig::default());

    AnalysisService::new(
        sentiment,
        emotion,
        RiskEngine::builtin().unwrap(),
        aspects,
        cache,
    )
}

fn basic_service(sentiment: Arc<MockProvider>, emotion: Arc<MockProvider>) -> AnalysisService {
    service(
        sentiment,
        emotion,
        Arc::new(BasicAnnotator::new()),
        Arc::new(MemoryCache::new(1000)),
    )
}

#[tokio::test]
async fn test_sentiment_is_cached_by_trimmed_text() {
    let sentiment = Arc::new(negative_provider());
    let svc = basic_service(sentiment.clone(), Arc::new(sad_provider()));

    let first = svc.analyze_sentiment("Terrible support").await.unwrap();
    let second = svc.analyze_sentiment("  Terrible support \n").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.label, Sentiment::Negative);
    assert_eq!(sentiment.call_count(), 1);
}

#[tokio::test]
async fn test_sentiment_and_emotion_cached_separately() {
    let sentiment = Arc::new(negative_provider());
    let emotion = Arc::new(sad_provider());
    let svc = basic_service(sentiment.clone(), emotion.clone());

    svc.analyze_sentiment("It rained all week").await.unwrap();
    let full = svc.analyze("It rained all week").await.unwrap();

    assert_eq!(full.emotion.label, Emotion::Sadness);
    assert_eq!(sentiment.call_count(), 1);
    assert_eq!(emotion.call_count(), 1);
}

#[tokio::test]
async fn test_analyze_fuses_risk() {
    let svc = basic_service(Arc::new(negative_provider()), Arc::new(sad_provider()));

    let full = svc
        .analyze("I can't see a way out anymore and feel like ending it all.")
        .await
        .unwrap();

    assert!(full.risk.is_flagged("self_harm"));
    assert!(full.risk.is_flagged("mental_health_distress"));
    assert_eq!(full.risk.risk_level(), RiskLevel::High);
    assert!(full.risk.has_risk());
    assert!(full
        .risk
        .recommendations()
        .iter()
        .any(|r| r.contains("URGENT")));
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let svc = basic_service(Arc::new(negative_provider()), Arc::new(sad_provider()));

    let err = svc.analyze("   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_cache_failures_degrade_to_recompute() {
    let sentiment = Arc::new(negative_provider());
    let svc = service(
        sentiment.clone(),
        Arc::new(sad_provider()),
        Arc::new(BasicAnnotator::new()),
        Arc::new(BrokenCache),
    );

    svc.analyze_sentiment("slow delivery").await.unwrap();
    svc.analyze_sentiment("slow delivery").await.unwrap();

    assert_eq!(sentiment.call_count(), 2);
}

#[tokio::test]
async fn test_bulk_isolates_failures_and_keeps_order() {
    let sentiment = Arc::new(negative_provider().failing_on("BROKEN"));
    let svc = basic_service(sentiment, Arc::new(sad_provider())).with_bulk_concurrency(2);

    let texts = vec![
        "first text".to_string(),
        "BROKEN input".to_string(),
        "third text".to_string(),
        "fourth text".to_string(),
    ];
    let report = svc.analyze_bulk(&texts).await;

    assert_eq!(report.total, 4);
    assert_eq!(report.successful, 3);
    assert_eq!(report.failed, 1);
    let order: Vec<_> = report.results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(order, vec!["first text", "third text", "fourth text"]);
}

#[tokio::test]
async fn test_bulk_runs_on_spawned_task() {
    let svc = Arc::new(basic_service(
        Arc::new(negative_provider()),
        Arc::new(sad_provider()),
    ));
    let texts = vec!["one".to_string(), "two".to_string()];

    // Handlers run bulk on Send tasks
    let report = tokio::spawn({
        let svc = svc.clone();
        async move { svc.analyze_bulk(&texts).await }
    })
    .await
    .unwrap();

    assert_eq!(report.successful, 2);
    assert_eq!(report.results[1].text, "two");
}

#[tokio::test]
async fn test_model_unavailable_is_distinguishable() {
    let sentiment = Arc::new(negative_provider().failing_on("outage"));
    let svc = basic_service(sentiment, Arc::new(sad_provider()));

    let err = svc.analyze("outage now").await.unwrap_err();
    assert!(err.is_dependency_unavailable());
}

#[tokio::test]
async fn test_aspects_from_annotated_nouns() {
    let text = "The battery lasts long but the screen scratches easily.";
    let battery = text.find("battery").unwrap();
    let screen = text.find("screen").unwrap();
    let annotation = Annotation {
        tokens: vec![
            Token {
                text: "battery".into(),
                pos: "NOUN".into(),
                dep: "nsubj".into(),
                offset: battery,
            },
            Token {
                text: "screen".into(),
                pos: "NOUN".into(),
                dep: "nsubj".into(),
                offset: screen,
            },
        ],
        sentences: vec![Sentence {
            start: 0,
            end: text.len(),
        }],
        ..Default::default()
    };

    let sentiment = MockProvider::new("sentiment", &[("neutral", 1.0)])
        .with_rule(
            "battery:",
            &[("positive", 0.9), ("neutral", 0.05), ("negative", 0.05)],
        )
        .with_rule(
            "screen:",
            &[("positive", 0.1), ("neutral", 0.2), ("negative", 0.7)],
        );
    let svc = service(
        Arc::new(sentiment),
        Arc::new(sad_provider()),
        Arc::new(MockAnnotator { annotation }),
        Arc::new(MemoryCache::new(100)),
    );

    let analysis = svc.analyze_aspects(text).await.unwrap();
    let AspectAnalysis::Found { aspects, overall } = analysis else {
        panic!("expected aspects");
    };

    assert_eq!(aspects.len(), 2);
    assert_eq!(aspects[0].aspect.text, "battery");
    assert_eq!(aspects[0].aspect.kind, AspectKind::Noun);
    assert_eq!(aspects[0].context, text);
    assert_eq!(aspects[0].sentiment.label, Sentiment::Positive);
    assert_eq!(aspects[1].sentiment.label, Sentiment::Negative);

    // weights 0.9/1.6 and 0.7/1.6
    assert_eq!(overall.label, Sentiment::Positive);
    assert!((overall.confidence - 0.55).abs() < 1e-9);
}

#[tokio::test]
async fn test_unavailable_annotator_falls_back_to_heuristic() {
    let svc = service(
        Arc::new(negative_provider()),
        Arc::new(sad_provider()),
        Arc::new(UnavailableAnnotator),
        Arc::new(MemoryCache::new(100)),
    );

    let analysis = svc.analyze_aspects("battery life is terrible").await.unwrap();
    let aspects = analysis.aspects();

    assert_eq!(aspects.len(), 1);
    assert_eq!(aspects[0].aspect.text, "battery life");
    assert_eq!(aspects[0].aspect.kind, AspectKind::Heuristic);
    assert_eq!(aspects[0].sentiment.label, Sentiment::Negative);
}

#[tokio::test]
async fn test_no_aspects_sentinel() {
    let svc = basic_service(Arc::new(negative_provider()), Arc::new(sad_provider()));

    let analysis = svc.analyze_aspects("ok.").await.unwrap();
    assert_eq!(analysis, AspectAnalysis::NoAspects);
}
