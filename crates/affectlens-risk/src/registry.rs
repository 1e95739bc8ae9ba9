//! Risk category registry
//!
//! The registry is built once from a YAML table and shared read-only across
//! every request. Category order in the table is detection order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::category::{CategorySpec, RiskCategory};
use crate::error::RiskError;
use crate::signals::SignalTable;

const BUILTIN_TABLE: &str = include_str!("../categories/default.yaml");

/// A risk table as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTable {
    /// Table format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Recommendation emitted when nothing is flagged
    pub safe_message: String,

    /// Categories in detection order
    pub categories: Vec<CategorySpec>,

    /// Model-signal adjustments
    pub signals: SignalTable,
}

fn default_version() -> String {
    "1".to_string()
}

/// Compiled, immutable set of risk categories plus model-signal rules
#[derive(Debug)]
pub struct CategoryRegistry {
    categories: Vec<RiskCategory>,
    signals: SignalTable,
    safe_message: String,
}

impl CategoryRegistry {
    /// The table shipped with the crate
    pub fn builtin() -> Result<Self, RiskError> {
        Self::from_yaml(BUILTIN_TABLE)
    }

    /// Load a table from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RiskError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_yaml(&content)?;
        info!(
            path = %path.display(),
            categories = registry.categories.len(),
            "Loaded risk table"
        );
        Ok(registry)
    }

    /// Parse and compile a table from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, RiskError> {
        let table: RiskTable = serde_yaml::from_str(yaml)?;
        Self::from_table(table)
    }

    /// Compile an already-parsed table
    pub fn from_table(table: RiskTable) -> Result<Self, RiskError> {
        if table.categories.is_empty() {
            return Err(RiskError::Invalid("table has no categories".to_string()));
        }

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(table.categories.len());
        for spec in table.categories {
            if !seen.insert(spec.name.clone()) {
                return Err(RiskError::Invalid(format!(
                    "duplicate category '{}'",
                    spec.name
                )));
            }
            let category = RiskCategory::compile(spec)?;
            debug!(
                category = category.name(),
                patterns = category.pattern_count(),
                weight = category.weight(),
                "Compiled risk category"
            );
            categories.push(category);
        }

        for rule in &table.signals.cross_rules {
            for referenced in [&rule.requires_matches_of, &rule.ensure_flag]
                .into_iter()
                .flatten()
            {
                if !seen.contains(referenced) {
                    return Err(RiskError::Invalid(format!(
                        "cross rule '{}' references unknown category '{}'",
                        rule.name, referenced
                    )));
                }
            }
        }

        Ok(Self {
            categories,
            signals: table.signals,
            safe_message: table.safe_message,
        })
    }

    /// Categories in detection order
    pub fn categories(&self) -> &[RiskCategory] {
        &self.categories
    }

    /// Position of a category in detection order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&RiskCategory> {
        self.index_of(name).map(|i| &self.categories[i])
    }

    pub fn signals(&self) -> &SignalTable {
        &self.signals
    }

    pub fn safe_message(&self) -> &str {
        &self.safe_message
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
