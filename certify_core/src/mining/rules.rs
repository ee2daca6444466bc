//! Association rule generation from frequent itemsets.

use std::cmp::Ordering;

use serde::Serialize;

use crate::features::TransactionMatrix;
use crate::mining::itemsets::{named, CountTable, Itemset};

/// An implication `antecedent → consequent` mined from the table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedent: Itemset,
    pub consequent: Itemset,
    /// Fraction of rows containing antecedent ∪ consequent.
    pub support: f64,
    /// support(antecedent ∪ consequent) / support(antecedent).
    pub confidence: f64,
    /// confidence / support(consequent).
    pub lift: f64,
}

impl AssociationRule {
    /// Human-readable form used in gap records, e.g.
    /// `IF [HAS_RISK] THEN [HAS_TEST]`.
    pub fn statement(&self) -> String {
        format!("IF {} THEN {}", self.antecedent, self.consequent)
    }
}

impl std::fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rule: {} (support {:.3}, confidence {:.3})",
            self.statement(),
            self.support,
            self.confidence
        )
    }
}

/// Every non-trivial split of every frequent itemset whose confidence
/// reaches `min_confidence`.
pub(crate) fn generate(
    matrix: &TransactionMatrix,
    frequent: &CountTable,
    min_confidence: f64,
) -> Vec<AssociationRule> {
    let rows = matrix.row_count() as f64;
    let mut rules = Vec::new();

    for (itemset, &count) in frequent.iter().filter(|(k, _)| k.len() >= 2) {
        let width = itemset.len();
        // Bit i of the mask puts itemset[i] into the antecedent.
        for mask in 1u64..(1u64 << width) - 1 {
            let (antecedent, consequent): (Vec<usize>, Vec<usize>) = {
                let mut ante = Vec::with_capacity(width);
                let mut cons = Vec::with_capacity(width);
                for (i, &column) in itemset.iter().enumerate() {
                    if mask & (1 << i) != 0 {
                        ante.push(column);
                    } else {
                        cons.push(column);
                    }
                }
                (ante, cons)
            };

            let ante_count = subset_count(matrix, frequent, &antecedent);
            if ante_count == 0 {
                continue;
            }
            let confidence = count as f64 / ante_count as f64;
            if confidence < min_confidence {
                continue;
            }

            let cons_support = subset_count(matrix, frequent, &consequent) as f64 / rows;
            let lift = if cons_support > 0.0 { confidence / cons_support } else { 0.0 };

            rules.push(AssociationRule {
                antecedent: named(matrix, &antecedent),
                consequent: named(matrix, &consequent),
                support: count as f64 / rows,
                confidence,
                lift,
            });
        }
    }

    rules
}

fn subset_count(matrix: &TransactionMatrix, frequent: &CountTable, columns: &[usize]) -> usize {
    frequent
        .get(columns)
        .copied()
        .unwrap_or_else(|| matrix.support_count(columns))
}

/// Descending confidence, then antecedent names, then descending support.
pub(crate) fn sort(rules: &mut [AssociationRule]) {
    rules.sort_by(compare);
}

/// Rule ordering used for every emitted rule set.
pub fn compare(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| b.support.total_cmp(&a.support))
        .then_with(|| a.consequent.cmp(&b.consequent))
}
