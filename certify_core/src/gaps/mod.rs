//! Gap module - Compliance gap discovery.
//!
//! Two engines produce [`GapCandidate`]s for remediation:
//!
//! - The mining pipeline ([`GapModule::discover`]): feature extraction,
//!   rule mining and exception finding, reported as a [`GapReport`]
//! - The deterministic engine ([`GapModule::find_unverified`]): every
//!   requirement no test verifies
//!
//! Neither engine mutates the graph.

pub mod unverified;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MiningConfig;
use crate::error::Result;
use crate::exceptions::GapRecord;
use crate::features::{FeatureExtractor, FeatureTable};
use crate::graph::GraphStore;
use crate::mining::RuleSet;
use crate::types::EntityId;

pub use unverified::UnverifiedRequirements;

/// A requirement handed to remediation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapCandidate {
    pub id: EntityId,
    pub text: String,
}

/// Result of one mining run.
#[derive(Clone, Debug, Serialize)]
pub struct GapReport {
    pub row_count: usize,
    pub rules: RuleSet,
    pub gaps: Vec<GapRecord>,
    /// Requirement id to text, for every extracted row.
    pub texts: BTreeMap<EntityId, String>,
}

impl GapReport {
    /// Runs rule mining and exception finding over an extracted table.
    pub fn from_table(table: &FeatureTable, config: &MiningConfig) -> Result<Self> {
        let matrix = table.encode(config.column_universe)?;
        let rules = config.miner()?.discover_rules(&matrix)?;
        let gaps = config.exception_finder().find_exceptions(&matrix, rules.rules())?;

        Ok(Self {
            row_count: matrix.row_count(),
            rules,
            gaps,
            texts: table.texts().clone(),
        })
    }

    /// One candidate per gap record, in record order.
    ///
    /// An entity violating several rules appears once per rule unless the
    /// run deduplicated by entity.
    pub fn candidates(&self) -> Vec<GapCandidate> {
        self.gaps
            .iter()
            .map(|gap| GapCandidate {
                id: gap.entity_id.clone(),
                text: self.texts.get(&gap.entity_id).cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Gap discovery over an injected graph store.
#[derive(Clone)]
pub struct GapModule {
    store: Arc<dyn GraphStore>,
    config: Arc<MiningConfig>,
}

impl GapModule {
    pub(crate) fn new(store: Arc<dyn GraphStore>, config: Arc<MiningConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Flattens the graph into a feature table.
    pub async fn extract_features(&self) -> Result<FeatureTable> {
        FeatureExtractor::new(self.config.vocabulary.clone())
            .extract(self.store.as_ref())
            .await
    }

    /// Runs the full mining pipeline.
    pub async fn discover(&self) -> Result<GapReport> {
        let table = self.extract_features().await?;
        let report = GapReport::from_table(&table, &self.config)?;

        match report.rules.empty_reason {
            Some(reason) => tracing::info!("Gap mining found no rules: {}", reason),
            None => tracing::info!(
                "Gap mining: {} rules, {} gaps over {} requirements",
                report.rules.len(),
                report.gaps.len(),
                report.row_count
            ),
        }
        Ok(report)
    }

    /// Requirements with no verifying test.
    pub async fn find_unverified(&self) -> Result<Vec<GapCandidate>> {
        UnverifiedRequirements::find(self.store.as_ref()).await
    }
}
