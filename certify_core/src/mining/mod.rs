//! Pattern mining - Association rules that predict verification coverage.
//!
//! The miner runs three steps over a [`TransactionMatrix`]:
//!
//! 1. Level-wise frequent itemset discovery at `min_support`
//! 2. Rule generation from every split of every frequent itemset, kept at
//!    `min_confidence`
//! 3. Target filtering: only rules whose consequent is exactly the target
//!    itemset survive
//!
//! Finding nothing is a normal outcome. The returned [`RuleSet`] says why
//! it is empty through [`EmptyReason`].
//!
//! # Examples
//!
//! ```rust
//! use certify_core::features::{ColumnUniverse, FeatureDimension, FeatureVocabulary, TransactionMatrix};
//! use certify_core::mining::PatternMiner;
//! use certify_core::types::RelationKind;
//!
//! let vocab = FeatureVocabulary::new(vec![
//!     FeatureDimension::new("test_status", RelationKind::Verifies, "HAS_TEST", "NO_TEST"),
//!     FeatureDimension::new("risk_status", RelationKind::Mitigates, "HAS_RISK", "NO_RISK"),
//! ]);
//! let matrix = TransactionMatrix::from_baskets(
//!     &vocab,
//!     vec![
//!         ("REQ-1", vec!["HAS_RISK", "HAS_TEST"]),
//!         ("REQ-2", vec!["HAS_RISK", "HAS_TEST"]),
//!         ("REQ-3", vec!["HAS_RISK", "NO_TEST"]),
//!     ],
//!     ColumnUniverse::Vocabulary,
//! ).unwrap();
//!
//! let rules = PatternMiner::default().discover_rules(&matrix).unwrap();
//! assert_eq!(rules.len(), 1);
//! assert_eq!(rules.rules()[0].statement(), "IF [HAS_RISK] THEN [HAS_TEST]");
//! ```

pub mod itemsets;
pub mod rules;

use serde::Serialize;

use crate::error::{CertifyError, Result};
use crate::features::TransactionMatrix;

pub use itemsets::{FrequentItemset, Itemset};
pub use rules::AssociationRule;

/// Why a mining run produced no rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The table had no rows.
    NoRows,
    /// No itemset cleared the support threshold.
    NoFrequentItemsets,
    /// No rule cleared the confidence threshold.
    NoConfidentRules,
    /// Confident rules exist but none predicts the target.
    NoTargetRules,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EmptyReason::NoRows => "feature table is empty",
            EmptyReason::NoFrequentItemsets => "no frequent itemsets found",
            EmptyReason::NoConfidentRules => "no association rules found",
            EmptyReason::NoTargetRules => "no rules predict the target",
        };
        f.write_str(text)
    }
}

/// Outcome of [`PatternMiner::discover_rules`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleSet {
    pub row_count: usize,
    pub rules: Vec<AssociationRule>,
    /// All frequent itemsets, largest support first.
    pub frequent_itemsets: Vec<FrequentItemset>,
    /// Set exactly when `rules` is empty.
    pub empty_reason: Option<EmptyReason>,
}

impl RuleSet {
    fn empty(row_count: usize, frequent_itemsets: Vec<FrequentItemset>, reason: EmptyReason) -> Self {
        Self {
            row_count,
            rules: Vec::new(),
            frequent_itemsets,
            empty_reason: Some(reason),
        }
    }

    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssociationRule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a AssociationRule;
    type IntoIter = std::slice::Iter<'a, AssociationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Apriori miner with a fixed target consequent.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternMiner {
    min_support: f64,
    min_confidence: f64,
    target: Itemset,
}

impl Default for PatternMiner {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.5,
            target: Itemset::new(["HAS_TEST"]),
        }
    }
}

impl PatternMiner {
    /// Creates a miner, rejecting thresholds outside their ranges.
    ///
    /// `min_support` must lie in (0, 1] and `min_confidence` in [0, 1].
    pub fn new(min_support: f64, min_confidence: f64) -> Result<Self> {
        if !(min_support > 0.0 && min_support <= 1.0) {
            return Err(CertifyError::InvalidConfig(format!(
                "min_support must be in (0, 1], got {}", min_support
            )));
        }
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(CertifyError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}", min_confidence
            )));
        }
        Ok(Self {
            min_support,
            min_confidence,
            ..Self::default()
        })
    }

    /// Replaces the target consequent.
    pub fn with_target(mut self, target: Itemset) -> Result<Self> {
        if target.is_empty() {
            return Err(CertifyError::InvalidConfig("target itemset is empty".to_string()));
        }
        self.target = target;
        Ok(self)
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn target(&self) -> &Itemset {
        &self.target
    }

    /// Discovers rules whose consequent is exactly the target.
    ///
    /// Never fails for a well-formed matrix. Rules are sorted by
    /// descending confidence, then antecedent, then descending support.
    pub fn discover_rules(&self, matrix: &TransactionMatrix) -> Result<RuleSet> {
        let rows = matrix.row_count();
        if rows == 0 {
            tracing::info!("Mining: feature table is empty");
            return Ok(RuleSet::empty(0, Vec::new(), EmptyReason::NoRows));
        }

        let frequent = itemsets::apriori(matrix, self.min_support);
        let mut frequent_itemsets: Vec<FrequentItemset> = frequent
            .iter()
            .map(|(columns, &count)| FrequentItemset {
                items: itemsets::named(matrix, columns),
                support: count as f64 / rows as f64,
                count,
            })
            .collect();
        frequent_itemsets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.items.cmp(&b.items)));

        if frequent_itemsets.is_empty() {
            tracing::info!("Mining: no frequent itemsets found");
            return Ok(RuleSet::empty(rows, frequent_itemsets, EmptyReason::NoFrequentItemsets));
        }

        let candidates = rules::generate(matrix, &frequent, self.min_confidence);
        if candidates.is_empty() {
            tracing::info!("Mining: no association rules found");
            return Ok(RuleSet::empty(rows, frequent_itemsets, EmptyReason::NoConfidentRules));
        }

        let confident = candidates.len();
        let mut accepted: Vec<AssociationRule> = candidates
            .into_iter()
            .filter(|rule| rule.consequent == self.target)
            .collect();

        if accepted.is_empty() {
            tracing::info!("Mining: none of {} rules predict {}", confident, self.target);
            return Ok(RuleSet::empty(rows, frequent_itemsets, EmptyReason::NoTargetRules));
        }

        rules::sort(&mut accepted);
        tracing::info!("Mining: found {} rules that predict {}", accepted.len(), self.target);

        Ok(RuleSet {
            row_count: rows,
            rules: accepted,
            frequent_itemsets,
            empty_reason: None,
        })
    }
}
