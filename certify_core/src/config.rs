//! Mining configuration.
//!
//! Thresholds, target, vocabulary and encoding choices for a mining run.
//! Every field has a default, so a YAML file only needs the keys it changes:
//!
//! ```yaml
//! min_support: 0.05
//! min_confidence: 0.8
//! dedup_by_entity: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CertifyError, Result};
use crate::exceptions::ExceptionFinder;
use crate::features::{ColumnUniverse, FeatureVocabulary};
use crate::mining::{Itemset, PatternMiner};

/// Configuration for the gap-mining pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Minimum fraction of rows an itemset must occur in.
    pub min_support: f64,
    /// Minimum confidence for a rule to be kept.
    pub min_confidence: f64,
    /// Exact consequent a rule must have to be reported.
    pub target: Vec<String>,
    /// Emit at most one gap record per entity.
    pub dedup_by_entity: bool,
    pub column_universe: ColumnUniverse,
    pub vocabulary: FeatureVocabulary,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.5,
            target: vec!["HAS_TEST".to_string()],
            dedup_by_entity: false,
            column_universe: ColumnUniverse::Vocabulary,
            vocabulary: FeatureVocabulary::default(),
        }
    }
}

impl MiningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_support(mut self, value: f64) -> Self {
        self.min_support = value;
        self
    }

    pub fn min_confidence(mut self, value: f64) -> Self {
        self.min_confidence = value;
        self
    }

    pub fn target<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn dedup_by_entity(mut self, enabled: bool) -> Self {
        self.dedup_by_entity = enabled;
        self
    }

    pub fn column_universe(mut self, universe: ColumnUniverse) -> Self {
        self.column_universe = universe;
        self
    }

    pub fn vocabulary(mut self, vocabulary: FeatureVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Checks thresholds, target and vocabulary.
    pub fn validate(&self) -> Result<()> {
        self.vocabulary.validate()?;
        self.miner()?;

        if let Some(unknown) = self.target.iter().find(|item| !self.vocabulary.contains_item(item)) {
            return Err(CertifyError::InvalidConfig(format!(
                "target item '{}' is not in the vocabulary", unknown
            )));
        }
        Ok(())
    }

    /// Builds the pattern miner described by this configuration.
    pub fn miner(&self) -> Result<PatternMiner> {
        PatternMiner::new(self.min_support, self.min_confidence)?
            .with_target(Itemset::new(self.target.iter().cloned()))
    }

    pub fn exception_finder(&self) -> ExceptionFinder {
        ExceptionFinder::new().dedup_by_entity(self.dedup_by_entity)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Loads and validates a YAML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml_str(&raw)?;
        tracing::debug!("Loaded mining config from {}", path.as_ref().display());
        Ok(config)
    }
}
