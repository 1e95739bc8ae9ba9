//! Server configuration

use affectlens_classifiers::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration.
///
/// Analyzer settings (`providers`, `cache`, `risk`, `aspects`, `bulk`, ...)
/// sit at the top level of the file next to the server's own keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(flatten)]
    pub analyzers: AnalyzerConfig,

    #[serde(default)]
    pub rate_limits: RateLimitsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

impl ServerConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, listen: Option<&str>, port: Option<u16>) -> Self {
        if let Some(listen) = listen {
            self.listen = listen.to_string();
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            analyzers: AnalyzerConfig::default(),
            rate_limits: RateLimitsConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// A fixed quota of requests per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub per_secs: u64,
}

impl RateLimit {
    const fn new(requests: u32, per_secs: u64) -> Self {
        Self { requests, per_secs }
    }
}

/// Per-endpoint limits, keyed by client IP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_analysis_limit")]
    pub analyze: RateLimit,

    #[serde(default = "default_analysis_limit")]
    pub sentiment: RateLimit,

    #[serde(default = "default_analysis_limit")]
    pub emotion: RateLimit,

    #[serde(default = "default_analysis_limit")]
    pub aspects: RateLimit,

    #[serde(default = "default_bulk_limit")]
    pub bulk: RateLimit,

    #[serde(default = "default_analysis_limit")]
    pub fetch: RateLimit,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            analyze: default_analysis_limit(),
            sentiment: default_analysis_limit(),
            emotion: default_analysis_limit(),
            aspects: default_analysis_limit(),
            bulk: default_bulk_limit(),
            fetch: default_analysis_limit(),
        }
    }
}

/// URL fetching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Allow plain-HTTP URLs
    #[serde(default = "default_true")]
    pub allow_http: bool,

    /// Allow loopback, private and internal hosts (development only)
    #[serde(default)]
    pub allow_private: bool,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Extracted text is cut to this many characters
    #[serde(default = "default_fetch_max_chars")]
    pub max_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allow_http: true,
            allow_private: false,
            timeout_secs: default_fetch_timeout(),
            max_chars: default_fetch_max_chars(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_analysis_limit() -> RateLimit {
    RateLimit::new(10, 60)
}

fn default_bulk_limit() -> RateLimit {
    RateLimit::new(5, 60)
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_fetch_max_chars() -> usize {
    5000
}
