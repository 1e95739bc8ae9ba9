//! Risk category definitions

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// A risk category as written in a table file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Flag name reported in verdicts
    pub name: String,

    /// What this category looks for
    #[serde(default)]
    pub description: String,

    /// Score added per distinct matching pattern
    pub weight: f64,

    /// Distinct matches needed before the category is flagged
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,

    /// Recommendation order (lower comes first)
    pub priority: u32,

    /// Case-insensitive regular expressions
    pub patterns: Vec<String>,

    /// Fixed recommendation lines emitted when flagged
    #[serde(default)]
    pub recommendations: Vec<String>,
}

fn default_min_matches() -> usize {
    1
}

/// A compiled, immutable risk category
#[derive(Debug)]
pub struct RiskCategory {
    name: String,
    description: String,
    weight: f64,
    min_matches: usize,
    priority: u32,
    patterns: Vec<Regex>,
    recommendations: Vec<String>,
}

impl RiskCategory {
    /// Validate a spec and compile its patterns
    pub fn compile(spec: CategorySpec) -> Result<Self, RiskError> {
        if spec.name.trim().is_empty() {
            return Err(RiskError::Invalid("category with empty name".to_string()));
        }
        if !spec.weight.is_finite() || spec.weight <= 0.0 {
            return Err(RiskError::Invalid(format!(
                "category '{}': weight must be positive, got {}",
                spec.name, spec.weight
            )));
        }
        if spec.min_matches == 0 {
            return Err(RiskError::Invalid(format!(
                "category '{}': min_matches must be at least 1",
                spec.name
            )));
        }
        if spec.patterns.is_empty() {
            return Err(RiskError::Invalid(format!(
                "category '{}' has no patterns",
                spec.name
            )));
        }

        let patterns = spec
            .patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RiskError::Pattern {
                        category: spec.name.clone(),
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name,
            description: spec.description,
            weight: spec.weight,
            min_matches: spec.min_matches,
            priority: spec.priority,
            patterns,
            recommendations: spec.recommendations,
        })
    }

    /// Number of distinct patterns matching anywhere in `text`.
    ///
    /// Each pattern counts at most once regardless of how often it occurs.
    pub fn count_matches(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn min_matches(&self) -> usize {
        self.min_matches
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(patterns: &[&str]) -> CategorySpec {
        CategorySpec {
            name: "war_conflict".to_string(),
            description: String::new(),
            weight: 0.5,
            min_matches: 1,
            priority: 1,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            recommendations: vec![],
        }
    }

    #[test]
    fn test_counts_distinct_patterns_not_occurrences() {
        let category = RiskCategory::compile(spec(&[r"\b(war)\b", r"\b(siege)\b"])).unwrap();
        assert_eq!(category.count_matches("war war war"), 1);
        assert_eq!(category.count_matches("war and siege"), 2);
    }

    #[test]
    fn test_word_boundary_prevents_substring_match() {
        let category = RiskCategory::compile(spec(&[r"\b(war)\b"])).unwrap();
        assert_eq!(category.count_matches("a warm welcome"), 0);
        assert_eq!(category.count_matches("Declared WAR today"), 1);
    }

    #[test]
    fn test_rejects_invalid_specs() {
        assert!(matches!(
            RiskCategory::compile(spec(&[r"\b(unclosed"])),
            Err(RiskError::Pattern { .. })
        ));
        assert!(matches!(
            RiskCategory::compile(spec(&[])),
            Err(RiskError::Invalid(_))
        ));

        let mut zero_weight = spec(&["x"]);
        zero_weight.weight = 0.0;
        assert!(RiskCategory::compile(zero_weight).is_err());

        let mut zero_min = spec(&["x"]);
        zero_min.min_matches = 0;
        assert!(RiskCategory::compile(zero_min).is_err());
    }
}
