//! affectlens Core
//!
//! Core types and utilities shared across affectlens components.
//!
//! This crate provides:
//! - Closed label sets for sentiment and emotion
//! - Validated probability distributions and classification results
//! - Error types and result handling
//! - Service readiness states
//! - Content-hash cache keys

pub mod error;
pub mod hashing;
pub mod types;

pub use error::{Error, Result};
pub use hashing::content_key;
pub use types::{
    ClassificationResult, Emotion, LabelSet, ProbabilityDistribution, Readiness, Sentiment,
    DISTRIBUTION_TOLERANCE, NEUTRAL_MARGIN,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ClassificationResult, Emotion, LabelSet, ProbabilityDistribution, Readiness, Sentiment,
    };
}
