//! Hugging Face Inference API provider
//!
//! Text-classification models answer `POST {base_url}/models/{model}` with
//! `[[{label, score}, ...]]` for a single input. Some deployments drop the
//! outer list, so both shapes are accepted.

use affectlens_core::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HuggingFaceConfig;
use crate::provider::{InferenceProvider, LabelScores};

/// Remote text-classification provider
#[derive(Clone)]
pub struct HuggingFaceProvider {
    name: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HuggingFaceProvider {
    /// Build a provider, reading the API token from the configured variable
    pub fn new(name: impl Into<String>, config: &HuggingFaceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                env = %config.api_key_env,
                model = %config.model,
                "No API token set, calling inference endpoint anonymously"
            );
        }
        Self::with_api_key(name, config, api_key)
    }

    /// Build a provider with an explicit token (used against mock servers)
    pub fn with_api_key(
        name: impl Into<String>,
        config: &HuggingFaceConfig,
        api_key: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn check_status(&self, status: StatusCode) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }

        match status {
            StatusCode::SERVICE_UNAVAILABLE => Err(Error::model_unavailable(
                &self.name,
                format!("model {} is loading", self.model),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::model_unavailable(
                &self.name,
                "inference endpoint rate limited",
            )),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::config(format!(
                "inference endpoint rejected credentials for {}",
                self.model
            ))),
            StatusCode::NOT_FOUND => Err(Error::config(format!(
                "model not found: {}",
                self.model
            ))),
            code => Err(Error::classifier(format!(
                "inference endpoint returned {} for {}",
                code, self.model
            ))),
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResponse {
    fn into_scores(self) -> Option<Vec<LabelScore>> {
        match self {
            Self::Nested(outer) => outer.into_iter().next(),
            Self::Flat(scores) => Some(scores),
        }
    }
}

#[async_trait]
impl InferenceProvider for HuggingFaceProvider {
    async fn infer(&self, text: &str) -> Result<LabelScores> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let mut request = self.http.post(&url).json(&InferenceRequest { inputs: text });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::model_unavailable(&self.name, e.to_string())
            }
        })?;

        self.check_status(response.status())?;

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| Error::classifier(format!("unexpected inference response: {e}")))?;

        let scores = body
            .into_scores()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::classifier("inference response contained no scores"))?;

        debug!(provider = %self.name, labels = scores.len(), "Inference complete");

        Ok(scores.into_iter().map(|s| (s.label, s.score)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
