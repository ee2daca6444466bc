//! Exception finding - Rows that break an accepted rule.
//!
//! A row violates a rule when every antecedent column is true and at least
//! one consequent column is false. Each violation becomes a [`GapRecord`].

use std::collections::HashSet;

use serde::Serialize;

use crate::error::Result;
use crate::features::TransactionMatrix;
use crate::mining::{AssociationRule, Itemset};
use crate::types::{EntityId, GapId};

/// One entity that satisfies a rule's premise but not its conclusion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GapRecord {
    pub id: GapId,
    pub entity_id: EntityId,
    /// `IF [..] THEN [..]`
    pub violated_rule: String,
    pub antecedent: Itemset,
    pub consequent: Itemset,
    pub confidence: f64,
    pub support: f64,
}

/// Computes rule violations.
///
/// By default a row violating several rules yields one record per rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExceptionFinder {
    dedup_by_entity: bool,
}

impl ExceptionFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the first record per entity, in rule order.
    pub fn dedup_by_entity(mut self, enabled: bool) -> Self {
        self.dedup_by_entity = enabled;
        self
    }

    pub fn is_deduplicating(&self) -> bool {
        self.dedup_by_entity
    }

    /// Finds every (rule, violating row) pair.
    ///
    /// Records come out in rule order, then row order. Rules naming columns
    /// the matrix does not have are rejected before any record is built.
    pub fn find_exceptions(&self, matrix: &TransactionMatrix, rules: &[AssociationRule]) -> Result<Vec<GapRecord>> {
        let resolved = rules
            .iter()
            .map(|rule| {
                let antecedent = matrix.resolve(rule.antecedent.items())?;
                let consequent = matrix.resolve(rule.consequent.items())?;
                Ok((rule, antecedent, consequent))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut gaps = Vec::new();

        for (rule, antecedent, consequent) in resolved {
            let statement = rule.statement();
            for row in 0..matrix.row_count() {
                let premise = antecedent.iter().all(|&c| matrix.is_set(row, c));
                let conclusion = consequent.iter().all(|&c| matrix.is_set(row, c));
                if !premise || conclusion {
                    continue;
                }

                let entity_id = &matrix.ids()[row];
                if self.dedup_by_entity && !seen.insert(entity_id.clone()) {
                    continue;
                }

                gaps.push(GapRecord {
                    id: GapId::derive(entity_id, &statement),
                    entity_id: entity_id.clone(),
                    violated_rule: statement.clone(),
                    antecedent: rule.antecedent.clone(),
                    consequent: rule.consequent.clone(),
                    confidence: rule.confidence,
                    support: rule.support,
                });
            }
        }

        tracing::info!("Mining: found {} exceptions to {} rules", gaps.len(), rules.len());
        Ok(gaps)
    }
}
