//! Feature vocabulary: which presence flags become mining items.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CertifyError, Result};
use crate::graph::queries::CoverageDimension;
use crate::types::RelationKind;

/// Upper bound on the number of dimensions. Rule generation enumerates
/// itemset splits as bitmasks, and an itemset holds at most one item per
/// dimension.
pub const MAX_DIMENSIONS: usize = 32;

/// One two-valued status dimension of a feature row.
///
/// A requirement takes the `present` value when it participates in at
/// least one relation of kind `relation`, and `absent` otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDimension {
    pub name: String,
    pub relation: RelationKind,
    pub present: String,
    pub absent: String,
}

impl FeatureDimension {
    pub fn new(
        name: impl Into<String>,
        relation: RelationKind,
        present: impl Into<String>,
        absent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relation,
            present: present.into(),
            absent: absent.into(),
        }
    }

    pub fn value(&self, present: bool) -> &str {
        if present {
            &self.present
        } else {
            &self.absent
        }
    }

    pub fn admits(&self, value: &str) -> bool {
        value == self.present || value == self.absent
    }
}

/// Ordered set of feature dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVocabulary {
    pub dimensions: Vec<FeatureDimension>,
}

impl Default for FeatureVocabulary {
    fn default() -> Self {
        Self {
            dimensions: vec![
                FeatureDimension::new("test_status", RelationKind::Verifies, "HAS_TEST", "NO_TEST"),
                FeatureDimension::new("code_status", RelationKind::Implements, "HAS_CODE", "NO_CODE"),
                FeatureDimension::new("risk_status", RelationKind::Mitigates, "HAS_RISK", "NO_RISK"),
            ],
        }
    }
}

impl FeatureVocabulary {
    pub fn new(dimensions: Vec<FeatureDimension>) -> Self {
        Self { dimensions }
    }

    pub fn dimension(&self, name: &str) -> Option<&FeatureDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Every item name, in dimension order, present value first.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.dimensions
            .iter()
            .flat_map(|d| [d.present.as_str(), d.absent.as_str()])
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.items().any(|i| i == item)
    }

    /// The dimension an item belongs to.
    pub fn dimension_of(&self, item: &str) -> Option<&FeatureDimension> {
        self.dimensions.iter().find(|d| d.admits(item))
    }

    pub fn coverage_dimensions(&self) -> Vec<CoverageDimension> {
        self.dimensions
            .iter()
            .map(|d| CoverageDimension {
                name: d.name.clone(),
                relation: d.relation,
            })
            .collect()
    }

    /// Checks that dimension names and item names are unique and non-empty,
    /// and that there are at most [`MAX_DIMENSIONS`] dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(CertifyError::InvalidConfig("vocabulary has no dimensions".to_string()));
        }
        if self.dimensions.len() > MAX_DIMENSIONS {
            return Err(CertifyError::InvalidConfig(format!(
                "vocabulary has {} dimensions, at most {} are supported",
                self.dimensions.len(),
                MAX_DIMENSIONS
            )));
        }

        let mut names = HashSet::new();
        let mut items = HashSet::new();
        for dim in &self.dimensions {
            if dim.name.is_empty() || dim.present.is_empty() || dim.absent.is_empty() {
                return Err(CertifyError::InvalidConfig(format!("dimension '{}' has an empty name or value", dim.name)));
            }
            if !names.insert(dim.name.as_str()) {
                return Err(CertifyError::InvalidConfig(format!("duplicate dimension '{}'", dim.name)));
            }
            for item in [dim.present.as_str(), dim.absent.as_str()] {
                if !items.insert(item) {
                    return Err(CertifyError::InvalidConfig(format!("duplicate item '{}'", item)));
                }
            }
        }
        Ok(())
    }
}
