//! Shared application state

use affectlens_classifiers::AnalysisService;
use affectlens_core::Readiness;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::fetch::UrlFetcher;
use crate::rate_limit::RateLimiters;

/// State handed to every handler.
///
/// The analysis service is installed once background initialization
/// finishes; until then analysis endpoints answer 503.
#[derive(Clone)]
pub struct AppState {
    service: Arc<OnceCell<Arc<AnalysisService>>>,
    readiness: watch::Receiver<Readiness>,
    pub limiters: Arc<RateLimiters>,
    pub fetcher: Arc<UrlFetcher>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        readiness: watch::Receiver<Readiness>,
        metrics: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            service: Arc::new(OnceCell::new()),
            readiness,
            limiters: Arc::new(RateLimiters::new(&config.rate_limits)),
            fetcher: Arc::new(UrlFetcher::new(&config.fetch)?),
            metrics,
        })
    }

    pub fn with_limiters(mut self, limiters: RateLimiters) -> Self {
        self.limiters = Arc::new(limiters);
        self
    }

    /// Make the analysis service available to handlers
    pub fn install(&self, service: Arc<AnalysisService>) {
        if self.service.set(service).is_err() {
            tracing::warn!("Analysis service already installed");
        }
    }

    pub fn service(&self) -> Result<&Arc<AnalysisService>, AppError> {
        self.service
            .get()
            .ok_or_else(|| AppError::Unavailable("analyzers are still loading".to_string()))
    }

    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }
}
