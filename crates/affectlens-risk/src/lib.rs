//! affectlens Risk
//!
//! Rule-based content-risk scoring over classifier outputs.
//!
//! Categories (patterns, weights, minimum match counts, recommendation
//! priorities) and model-signal bonuses are declared in a YAML table. The
//! built-in table lives in `categories/default.yaml` and can be replaced at
//! startup with [`CategoryRegistry::from_file`].
//!
//! ```no_run
//! use affectlens_core::{Emotion, Sentiment};
//! use affectlens_risk::RiskEngine;
//!
//! let engine = RiskEngine::builtin()?;
//! let verdict = engine.detect_risks("text", Sentiment::Neutral, Emotion::Neutral, None);
//! assert!(verdict.risk_score() <= 1.0);
//! # Ok::<(), affectlens_risk::RiskError>(())
//! ```

pub mod category;
pub mod engine;
pub mod error;
pub mod registry;
pub mod signals;
pub mod verdict;

pub use category::{CategorySpec, RiskCategory};
pub use engine::RiskEngine;
pub use error::RiskError;
pub use registry::{CategoryRegistry, RiskTable};
pub use signals::{ConfidenceTier, CrossRule, NegativeSentimentBonus, SignalTable};
pub use verdict::{RiskLevel, RiskVerdict, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
