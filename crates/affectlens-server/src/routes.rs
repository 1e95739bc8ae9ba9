//! HTTP routes and handlers

use affectlens_classifiers::aspects::{
    AspectAnalysis, AspectKind, OverallSentiment, NO_ASPECTS_MESSAGE,
};
use affectlens_classifiers::BulkReport;
use affectlens_core::{
    ClassificationResult, Emotion, LabelSet, ProbabilityDistribution, Sentiment,
};
use affectlens_risk::RiskVerdict;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::debug;

use crate::error::AppError;
use crate::fetch::{FetchError, FetchedPage};
use crate::rate_limit::Endpoint;
use crate::state::AppState;

/// Upper bound on trimmed input length, in characters
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Upper bound on items in a bulk request
pub const MAX_BULK_ITEMS: usize = 100;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/metrics", get(render_metrics))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/analysis/sentiment", post(analyze_sentiment))
        .route("/api/v1/analysis/emotion", post(analyze_emotion))
        .route("/api/v1/analysis/aspects", post(analyze_aspects))
        .route("/api/v1/analysis/bulk", post(analyze_bulk))
        .route("/api/v1/fetch-url", post(fetch_url))
        .fallback(fallback)
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let readiness = state.readiness();
    let status = if readiness.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "status": readiness })))
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "message": "Not found", "type": "not_found" } })),
    )
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    texts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    url: String,
}

#[derive(Debug, Serialize)]
struct SentimentBody {
    sentiment: &'static str,
    scores: BTreeMap<&'static str, f64>,
    confidence: f64,
    probabilities: BTreeMap<&'static str, f64>,
}

impl From<&ClassificationResult<Sentiment>> for SentimentBody {
    fn from(result: &ClassificationResult<Sentiment>) -> Self {
        let scores = label_map(&result.distribution);
        Self {
            sentiment: result.label.as_str(),
            probabilities: scores.clone(),
            scores,
            confidence: result.confidence(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmotionBody {
    emotion: &'static str,
    probabilities: BTreeMap<&'static str, f64>,
}

impl From<&ClassificationResult<Emotion>> for EmotionBody {
    fn from(result: &ClassificationResult<Emotion>) -> Self {
        Self {
            emotion: result.label.as_str(),
            probabilities: label_map(&result.distribution),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeBody {
    text: String,
    sentiment: SentimentBody,
    emotion: EmotionBody,
    risk_analysis: RiskVerdict,
}

#[derive(Debug, Serialize)]
struct Position {
    start: usize,
    end: usize,
}

#[derive(Debug, Serialize)]
struct AspectBody {
    aspect: String,
    #[serde(rename = "type")]
    kind: AspectKind,
    label: String,
    position: Position,
    sentiment: &'static str,
    confidence: f64,
    probabilities: BTreeMap<&'static str, f64>,
    context: String,
}

#[derive(Debug, Serialize)]
struct OverallBody {
    sentiment: &'static str,
    confidence: f64,
    probabilities: BTreeMap<&'static str, f64>,
}

impl From<&OverallSentiment> for OverallBody {
    fn from(overall: &OverallSentiment) -> Self {
        Self {
            sentiment: overall.label.as_str(),
            confidence: overall.confidence,
            probabilities: label_map(&overall.distribution),
        }
    }
}

#[derive(Debug, Serialize)]
struct AspectsBody {
    text: String,
    aspects: Vec<AspectBody>,
    overall_sentiment: OverallBody,
    total_aspects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct BulkItemBody {
    text: String,
    sentiment: &'static str,
    scores: BTreeMap<&'static str, f64>,
    emotion: &'static str,
    probabilities: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Serialize)]
struct BulkBody {
    results: Vec<BulkItemBody>,
    total: usize,
    successful: usize,
    failed: usize,
}

impl From<BulkReport> for BulkBody {
    fn from(report: BulkReport) -> Self {
        let results = report
            .results
            .into_iter()
            .map(|item| BulkItemBody {
                sentiment: item.sentiment.label.as_str(),
                scores: label_map(&item.sentiment.distribution),
                emotion: item.emotion.label.as_str(),
                probabilities: label_map(&item.emotion.distribution),
                text: item.text,
            })
            .collect();
        Self {
            results,
            total: report.total,
            successful: report.successful,
            failed: report.failed,
        }
    }
}

async fn analyze(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<AnalyzeBody>, AppError> {
    admit(&state, Endpoint::Analyze, connect)?;
    let Json(request) = payload?;
    let text = validate_text(&request.text)?;

    let analysis = state.service()?.analyze(&text).await?;

    Ok(Json(AnalyzeBody {
        sentiment: SentimentBody::from(&analysis.sentiment),
        emotion: EmotionBody::from(&analysis.emotion),
        risk_analysis: analysis.risk,
        text,
    }))
}

async fn analyze_sentiment(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<SentimentBody>, AppError> {
    admit(&state, Endpoint::Sentiment, connect)?;
    let Json(request) = payload?;
    let text = validate_text(&request.text)?;

    let result = state.service()?.analyze_sentiment(&text).await?;
    Ok(Json(SentimentBody::from(&result)))
}

async fn analyze_emotion(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<EmotionBody>, AppError> {
    admit(&state, Endpoint::Emotion, connect)?;
    let Json(request) = payload?;
    let text = validate_text(&request.text)?;

    let result = state.service()?.analyze_emotion(&text).await?;
    Ok(Json(EmotionBody::from(&result)))
}

async fn analyze_aspects(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<AspectsBody>, AppError> {
    admit(&state, Endpoint::Aspects, connect)?;
    let Json(request) = payload?;
    let text = validate_text(&request.text)?;

    let analysis = state.service()?.analyze_aspects(&text).await?;

    let body = match analysis {
        AspectAnalysis::Found { aspects, overall } => AspectsBody {
            total_aspects: aspects.len(),
            aspects: aspects
                .into_iter()
                .map(|verdict| AspectBody {
                    sentiment: verdict.sentiment.label.as_str(),
                    probabilities: label_map(&verdict.sentiment.distribution),
                    confidence: verdict.confidence,
                    position: Position {
                        start: verdict.aspect.start,
                        end: verdict.aspect.end,
                    },
                    aspect: verdict.aspect.text,
                    kind: verdict.aspect.kind,
                    label: verdict.aspect.label,
                    context: verdict.context,
                })
                .collect(),
            overall_sentiment: OverallBody::from(&overall),
            message: None,
            text,
        },
        AspectAnalysis::NoAspects => AspectsBody {
            aspects: Vec::new(),
            overall_sentiment: OverallBody::from(&OverallSentiment::no_aspects()?),
            total_aspects: 0,
            message: Some(NO_ASPECTS_MESSAGE),
            text,
        },
    };

    Ok(Json(body))
}

async fn analyze_bulk(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<Json<BulkBody>, AppError> {
    admit(&state, Endpoint::Bulk, connect)?;
    let Json(request) = payload?;
    let texts = validate_bulk(request.texts)?;

    let report = state.service()?.analyze_bulk(&texts).await;
    Ok(Json(BulkBody::from(report)))
}

async fn fetch_url(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<FetchedPage>, AppError> {
    admit(&state, Endpoint::Fetch, connect)?;
    let Json(request) = payload?;

    let page = state
        .fetcher
        .fetch(&request.url)
        .await
        .map_err(fetch_error)?;
    Ok(Json(page))
}

/// Count the request and apply the endpoint's rate limit
fn admit(
    state: &AppState,
    endpoint: Endpoint,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Result<(), AppError> {
    metrics::counter!("affectlens_requests_total", "endpoint" => endpoint.as_str()).increment(1);

    let ip = connect
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    state.limiters.check(endpoint, ip)
}

/// Trimmed text of 1 to [`MAX_TEXT_CHARS`] characters
fn validate_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Text cannot be empty or whitespace only".to_string(),
        ));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "Text is {} characters, the maximum is {}",
            chars, MAX_TEXT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// 1 to [`MAX_BULK_ITEMS`] items; blank items are dropped after trimming
fn validate_bulk(texts: Vec<String>) -> Result<Vec<String>, AppError> {
    if texts.is_empty() || texts.len() > MAX_BULK_ITEMS {
        return Err(AppError::InvalidRequest(format!(
            "texts must contain between 1 and {} items, got {}",
            MAX_BULK_ITEMS,
            texts.len()
        )));
    }

    let mut kept = Vec::with_capacity(texts.len());
    for text in &texts {
        if text.trim().is_empty() {
            continue;
        }
        kept.push(validate_text(text)?);
    }
    debug!(
        received = texts.len(),
        kept = kept.len(),
        "Validated bulk request"
    );

    if kept.is_empty() {
        return Err(AppError::InvalidRequest(
            "texts must contain at least one non-empty item".to_string(),
        ));
    }
    Ok(kept)
}

fn fetch_error(err: FetchError) -> AppError {
    match err {
        FetchError::Status(status) if status.is_client_error() || status.is_server_error() => {
            AppError::Upstream {
                status,
                message: err.to_string(),
            }
        }
        FetchError::Status(_) => AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        },
        FetchError::Blocked(_) | FetchError::Network(_) | FetchError::NoText => {
            AppError::InvalidRequest(err.to_string())
        }
    }
}

/// Every label with missing entries as 0.0
fn label_map<L: LabelSet>(
    distribution: &ProbabilityDistribution<L>,
) -> BTreeMap<&'static str, f64> {
    distribution
        .dense()
        .into_iter()
        .map(|(label, p)| (label.as_str(), p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_bounds() {
        assert_eq!(validate_text("  hello \n").unwrap(), "hello");
        assert!(validate_text(" \t").is_err());
        assert!(validate_text(&"a".repeat(MAX_TEXT_CHARS)).is_ok());
        assert!(validate_text(&"a".repeat(MAX_TEXT_CHARS + 1)).is_err());
        // Bound is in characters, not bytes
        assert!(validate_text(&"é".repeat(MAX_TEXT_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_bulk_strips_blanks() {
        let texts = vec!["one".to_string(), "   ".to_string(), " two ".to_string()];
        assert_eq!(validate_bulk(texts).unwrap(), vec!["one", "two"]);

        assert!(validate_bulk(Vec::new()).is_err());
        assert!(validate_bulk(vec!["x".to_string(); MAX_BULK_ITEMS + 1]).is_err());
        assert!(validate_bulk(vec![" ".to_string(), "".to_string()]).is_err());
    }

    #[test]
    fn test_fetch_error_status_passthrough() {
        let err = fetch_error(FetchError::Status(StatusCode::NOT_FOUND));
        assert!(matches!(
            err,
            AppError::Upstream { status, .. } if status == StatusCode::NOT_FOUND
        ));
        assert!(matches!(
            fetch_error(FetchError::NoText),
            AppError::InvalidRequest(_)
        ));
    }
}
