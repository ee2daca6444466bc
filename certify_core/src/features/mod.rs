//! Feature extraction - Flattening the compliance graph into transactions.
//!
//! Every Requirement becomes one row whose values record whether it is
//! verified, implemented and mitigating a risk. Rows are the baskets the
//! pattern miner works on.

pub mod encoding;
pub mod vocabulary;

use std::collections::BTreeMap;

use crate::error::{CertifyError, Result};
use crate::graph::queries::{record_bool, record_str, GraphQuery};
use crate::graph::GraphStore;
use crate::types::EntityId;

pub use encoding::{ColumnUniverse, TransactionMatrix};
pub use vocabulary::{FeatureDimension, FeatureVocabulary};

/// One requirement's categorical status values, keyed by dimension name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FeatureRow {
    pub id: EntityId,
    pub values: BTreeMap<String, String>,
}

impl FeatureRow {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    /// Sets a dimension value (builder pattern).
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(dimension.into(), value.into());
        self
    }

    pub fn value(&self, dimension: &str) -> Option<&str> {
        self.values.get(dimension).map(String::as_str)
    }

    /// The row's items in vocabulary order.
    ///
    /// Fails if a dimension is missing, unknown, or holds a foreign value.
    pub fn basket<'a>(&'a self, vocabulary: &FeatureVocabulary) -> Result<Vec<&'a str>> {
        if let Some(extra) = self.values.keys().find(|k| vocabulary.dimension(k).is_none()) {
            return Err(CertifyError::MalformedFeatureTable(format!(
                "row {} has unknown dimension '{}'", self.id, extra
            )));
        }

        vocabulary
            .dimensions
            .iter()
            .map(|dim| {
                let value = self.value(&dim.name).ok_or_else(|| {
                    CertifyError::MalformedFeatureTable(format!("row {} is missing '{}'", self.id, dim.name))
                })?;
                if !dim.admits(value) {
                    return Err(CertifyError::MalformedFeatureTable(format!(
                        "row {} has '{}' = '{}', expected {} or {}",
                        self.id, dim.name, value, dim.present, dim.absent
                    )));
                }
                Ok(value)
            })
            .collect()
    }
}

/// The flattened requirement table plus the out-of-band id → text map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureTable {
    vocabulary: FeatureVocabulary,
    rows: Vec<FeatureRow>,
    texts: BTreeMap<EntityId, String>,
}

impl FeatureTable {
    pub fn new(vocabulary: FeatureVocabulary) -> Self {
        Self {
            vocabulary,
            rows: Vec::new(),
            texts: BTreeMap::new(),
        }
    }

    /// Builds a table from (id, items) baskets, mapping each item to its dimension.
    pub fn from_baskets<'a, I, B>(vocabulary: FeatureVocabulary, baskets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, B)>,
        B: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new(vocabulary);
        for (id, items) in baskets {
            let mut row = FeatureRow::new(id);
            for item in items {
                let dim = table.vocabulary.dimension_of(item).ok_or_else(|| {
                    CertifyError::MalformedFeatureTable(format!("unknown item '{}' in row {}", item, id))
                })?;
                if row.values.insert(dim.name.clone(), item.to_string()).is_some() {
                    return Err(CertifyError::MalformedFeatureTable(format!(
                        "row {} has two values for '{}'", id, dim.name
                    )));
                }
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn push(&mut self, row: FeatureRow, text: impl Into<String>) {
        self.texts.insert(row.id.clone(), text.into());
        self.rows.push(row);
    }

    pub fn vocabulary(&self) -> &FeatureVocabulary {
        &self.vocabulary
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn text_of(&self, id: &EntityId) -> Option<&str> {
        self.texts.get(id).map(String::as_str)
    }

    pub fn texts(&self) -> &BTreeMap<EntityId, String> {
        &self.texts
    }

    /// One-hot encodes the table for mining.
    pub fn encode(&self, universe: ColumnUniverse) -> Result<TransactionMatrix> {
        TransactionMatrix::encode(self, universe)
    }
}

/// Projects Requirement entities into a [`FeatureTable`].
#[derive(Clone, Debug, Default)]
pub struct FeatureExtractor {
    vocabulary: FeatureVocabulary,
}

impl FeatureExtractor {
    pub fn new(vocabulary: FeatureVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Issues one coverage query and builds a row per requirement.
    ///
    /// A graph with no requirements yields an empty table.
    pub async fn extract(&self, store: &dyn GraphStore) -> Result<FeatureTable> {
        tracing::info!("Extracting features for {} dimensions", self.vocabulary.dimensions.len());

        let query = GraphQuery::requirement_coverage(&self.vocabulary.coverage_dimensions());
        let records = store.run_query(&query).await?;

        let mut table = FeatureTable::new(self.vocabulary.clone());
        for record in &records {
            let mut row = FeatureRow::new(record_str(record, "id")?);
            for dim in &self.vocabulary.dimensions {
                let present = record_bool(record, &dim.name)?;
                row.values.insert(dim.name.clone(), dim.value(present).to_string());
            }
            let text = record.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            table.push(row, text);
        }

        tracing::debug!("Extracted {} feature rows", table.len());
        Ok(table)
    }
}
