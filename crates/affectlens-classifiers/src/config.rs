//! Configuration for analyzers, providers and caching

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for every analyzer the service constructs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Inference providers per task
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Substitute the lexicon provider when a remote provider is unreachable
    #[serde(default = "default_true")]
    pub fallback_to_lexicon: bool,

    /// Character budget applied before inference
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub aspects: AspectConfig,

    #[serde(default)]
    pub bulk: BulkConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            fallback_to_lexicon: true,
            max_input_chars: default_max_input_chars(),
            cache: CacheConfig::default(),
            risk: RiskConfig::default(),
            aspects: AspectConfig::default(),
            bulk: BulkConfig::default(),
        }
    }
}

/// Provider selection per task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub sentiment: ProviderSpec,

    #[serde(default)]
    pub emotion: ProviderSpec,
}

/// Provider specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderSpec {
    /// Built-in keyword lexicon
    #[default]
    Lexicon,

    /// Hugging Face Inference API (or a compatible endpoint)
    Huggingface(HuggingFaceConfig),
}

/// Hugging Face provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    /// Model id, e.g. `cardiffnlp/twitter-roberta-base-sentiment-latest`
    pub model: String,

    #[serde(default = "default_hf_base_url")]
    pub base_url: String,

    /// Environment variable holding the API token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Provider label -> canonical label (e.g. `LABEL_0: negative`)
    #[serde(default)]
    pub label_aliases: HashMap<String, String>,
}

impl ProviderSpec {
    /// Label aliases configured for this provider
    pub fn label_aliases(&self) -> HashMap<String, String> {
        match self {
            Self::Lexicon => HashMap::new(),
            Self::Huggingface(hf) => hf.label_aliases.clone(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendSpec,

    /// Entry lifetime
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendSpec::default(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheBackendSpec {
    /// In-process cache
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    },

    /// Shared Redis cache (requires the `redis` feature)
    Redis { url: String },
}

impl Default for CacheBackendSpec {
    fn default() -> Self {
        Self::Memory {
            max_entries: default_max_entries(),
        }
    }
}

/// Risk table override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    /// YAML table replacing the built-in categories
    #[serde(default)]
    pub categories_path: Option<PathBuf>,
}

/// Aspect extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectConfig {
    #[serde(default = "default_max_aspects")]
    pub max_aspects: usize,

    /// Characters of context on each side when no sentence is available
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Positive/negative mass difference under which the overall label is neutral
    #[serde(default = "default_neutral_margin")]
    pub neutral_margin: f64,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            max_aspects: default_max_aspects(),
            context_window: default_context_window(),
            neutral_margin: default_neutral_margin(),
        }
    }
}

/// Bulk orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Items analyzed concurrently
    #[serde(default = "default_bulk_concurrency")]
    pub concurrency: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_bulk_concurrency(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_input_chars() -> usize {
    2000
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_api_key_env() -> String {
    "HF_API_TOKEN".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_max_aspects() -> usize {
    10
}

fn default_context_window() -> usize {
    50
}

fn default_neutral_margin() -> f64 {
    affectlens_core::NEUTRAL_MARGIN
}

fn default_bulk_concurrency() -> usize {
    4
}
