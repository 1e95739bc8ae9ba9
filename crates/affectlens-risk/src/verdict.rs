//! Risk verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at or above which a verdict is `high`
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Score at or above which a verdict is `medium`
pub const MEDIUM_THRESHOLD: f64 = 0.4;

/// Coarse risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Step function over a clamped score
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of risk detection for a single text.
///
/// Fields are private so that `has_risk`, `risk_level` and the score range
/// always agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskVerdict {
    has_risk: bool,
    risk_level: RiskLevel,
    risk_score: f64,
    flags: Vec<String>,
    recommendations: Vec<String>,
}

impl RiskVerdict {
    /// Build a verdict from a raw (unclamped) score.
    ///
    /// `flags` must already be free of duplicates and in detection order.
    pub fn new(raw_score: f64, flags: Vec<String>, recommendations: Vec<String>) -> Self {
        let risk_score = if raw_score.is_finite() {
            raw_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            has_risk: !flags.is_empty(),
            risk_level: RiskLevel::from_score(risk_score),
            risk_score,
            flags,
            recommendations,
        }
    }

    pub fn has_risk(&self) -> bool {
        self.has_risk
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn is_flagged(&self, category: &str) -> bool {
        self.flags.iter().any(|f| f == category)
    }
}
