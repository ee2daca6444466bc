//! Deterministic gap engine: requirements nothing verifies.

use crate::error::Result;
use crate::gaps::GapCandidate;
use crate::graph::queries::{record_str, GraphQuery};
use crate::graph::GraphStore;

/// Finds every Requirement with no incoming VERIFIES relation.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedRequirements;

impl UnverifiedRequirements {
    /// Returns candidates in identifier order.
    pub async fn find(store: &dyn GraphStore) -> Result<Vec<GapCandidate>> {
        tracing::info!("Mining for unverified requirement patterns");
        let records = store.run_query(&GraphQuery::unverified_requirements()).await?;

        let mut candidates = records
            .iter()
            .map(|record| {
                Ok(GapCandidate {
                    id: record_str(record, "id")?.into(),
                    text: record.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!("Found {} unverified requirements", candidates.len());
        Ok(candidates)
    }
}
