//! One-hot transaction encoding of a feature table.

use serde::{Deserialize, Serialize};

use crate::error::{CertifyError, Result};
use crate::features::vocabulary::MAX_DIMENSIONS;
use crate::features::{FeatureTable, FeatureVocabulary};
use crate::types::EntityId;

/// How the set of matrix columns is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnUniverse {
    /// Every vocabulary item is a column, observed or not.
    #[default]
    Vocabulary,
    /// Only items some row actually takes become columns.
    Observed,
}

/// Boolean row × item matrix, stored column-major.
///
/// Row `r` of every column belongs to entity `ids[r]`. Within each
/// vocabulary dimension exactly one column is true per row (when both of
/// its columns exist).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionMatrix {
    columns: Vec<String>,
    cells: Vec<Vec<bool>>,
    ids: Vec<EntityId>,
}

impl TransactionMatrix {
    /// Encodes a feature table. Values outside the vocabulary, missing
    /// dimensions and vocabularies wider than [`MAX_DIMENSIONS`] are a
    /// contract violation.
    pub fn encode(table: &FeatureTable, universe: ColumnUniverse) -> Result<Self> {
        let vocabulary = table.vocabulary();
        if vocabulary.dimensions.len() > MAX_DIMENSIONS {
            return Err(CertifyError::MalformedFeatureTable(format!(
                "{} dimensions exceed the limit of {}",
                vocabulary.dimensions.len(),
                MAX_DIMENSIONS
            )));
        }
        let mut baskets = Vec::with_capacity(table.len());
        for row in table.rows() {
            baskets.push(row.basket(vocabulary)?);
        }

        let columns: Vec<String> = vocabulary
            .items()
            .filter(|item| match universe {
                ColumnUniverse::Vocabulary => true,
                ColumnUniverse::Observed => baskets.iter().any(|b| b.contains(item)),
            })
            .map(str::to_string)
            .collect();

        let cells = columns
            .iter()
            .map(|column| baskets.iter().map(|b| b.contains(&column.as_str())).collect())
            .collect();

        Ok(Self {
            columns,
            cells,
            ids: table.rows().iter().map(|r| r.id.clone()).collect(),
        })
    }

    /// Builds a matrix directly from baskets of item names.
    ///
    /// Every item must belong to `vocabulary`; each basket must hold
    /// exactly one value of every dimension.
    pub fn from_baskets<'a, I, B>(vocabulary: &FeatureVocabulary, baskets: I, universe: ColumnUniverse) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, B)>,
        B: IntoIterator<Item = &'a str>,
    {
        let table = FeatureTable::from_baskets(vocabulary.clone(), baskets)?;
        Self::encode(&table, universe)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn is_set(&self, row: usize, column: usize) -> bool {
        self.cells[column][row]
    }

    pub fn column(&self, column: usize) -> &[bool] {
        &self.cells[column]
    }

    /// Number of rows in which every listed column is true.
    ///
    /// The empty set is contained in every row.
    pub fn support_count(&self, items: &[usize]) -> usize {
        (0..self.row_count())
            .filter(|&row| items.iter().all(|&c| self.cells[c][row]))
            .count()
    }

    /// Resolves item names to column indices.
    pub fn resolve(&self, items: &[String]) -> Result<Vec<usize>> {
        items
            .iter()
            .map(|item| {
                self.column_index(item).ok_or_else(|| {
                    CertifyError::MalformedFeatureTable(format!("no column named '{}'", item))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("REQ-001", vec!["HAS_TEST", "HAS_CODE", "NO_RISK"]),
            ("REQ-002", vec!["NO_TEST", "HAS_CODE", "NO_RISK"]),
        ]
    }

    #[test]
    fn test_vocabulary_universe_has_all_items() {
        let vocab = FeatureVocabulary::default();
        let matrix = TransactionMatrix::from_baskets(&vocab, sample(), ColumnUniverse::Vocabulary).unwrap();

        assert_eq!(matrix.columns().len(), 6);
        let has_risk = matrix.column_index("HAS_RISK").unwrap();
        assert_eq!(matrix.support_count(&[has_risk]), 0);
    }

    #[test]
    fn test_wide_vocabulary_rejected_at_encoding() {
        use crate::features::FeatureDimension;
        use crate::types::RelationKind;

        let dims = (0..MAX_DIMENSIONS + 1)
            .map(|i| FeatureDimension::new(format!("dim_{}", i), RelationKind::Implements, format!("HAS_{}", i), format!("NO_{}", i)))
            .collect();
        let table = FeatureTable::new(FeatureVocabulary::new(dims));

        let result = TransactionMatrix::encode(&table, ColumnUniverse::Vocabulary);
        assert!(matches!(result, Err(CertifyError::MalformedFeatureTable(_))));
    }

    #[test]
    fn test_observed_universe_drops_unseen_items() {
        let vocab = FeatureVocabulary::default();
        let matrix = TransactionMatrix::from_baskets(&vocab, sample(), ColumnUniverse::Observed).unwrap();

        assert_eq!(matrix.columns(), &["HAS_TEST", "NO_TEST", "HAS_CODE", "NO_RISK"]);
        assert!(matrix.column_index("HAS_RISK").is_none());
    }

    #[test]
    fn test_support_count() {
        let vocab = FeatureVocabulary::default();
        let matrix = TransactionMatrix::from_baskets(&vocab, sample(), ColumnUniverse::Vocabulary).unwrap();
        let items = matrix.resolve(&["HAS_CODE".to_string(), "NO_RISK".to_string()]).unwrap();

        assert_eq!(matrix.support_count(&items), 2);
        assert_eq!(matrix.support_count(&[]), 2);
        assert_eq!(matrix.ids()[1].as_str(), "REQ-002");
    }

    #[test]
    fn test_resolve_unknown_column() {
        let vocab = FeatureVocabulary::default();
        let matrix = TransactionMatrix::from_baskets(&vocab, sample(), ColumnUniverse::Observed).unwrap();
        let err = matrix.resolve(&["HAS_RISK".to_string()]).unwrap_err();
        assert!(matches!(err, CertifyError::MalformedFeatureTable(_)));
    }

    #[test]
    fn test_exactly_one_value_per_dimension() {
        let vocab = FeatureVocabulary::default();
        let matrix = TransactionMatrix::from_baskets(&vocab, sample(), ColumnUniverse::Vocabulary).unwrap();

        for row in 0..matrix.row_count() {
            for dim in &vocab.dimensions {
                let present = matrix.is_set(row, matrix.column_index(&dim.present).unwrap());
                let absent = matrix.is_set(row, matrix.column_index(&dim.absent).unwrap());
                assert!(present ^ absent);
            }
        }
    }
}
