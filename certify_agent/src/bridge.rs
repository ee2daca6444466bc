//! Gap-to-remediation bridge - Review queue between suggestion and mutation.
//!
//! Gap candidates from either engine are turned into suggestions and held
//! until a reviewer approves or rejects them. Approval is the only step
//! that writes to the graph.

use std::sync::Arc;

use certify_core::gaps::GapCandidate;
use certify_core::graph::GraphStore;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::mutate::{GraphMutator, MutationOutcome};
use crate::suggest::{generate_suggestions, RemediationSuggestion, SuggestionService};
use crate::{AgentError, Result};

/// Pending remediation suggestions awaiting review.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use certify_agent::{RemediationBridge, TemplateSuggestionService};
/// use certify_core::Certify;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let certify = Certify::open_snapshot("graph.json").await?;
/// let bridge = RemediationBridge::new(
///     certify.store().clone(),
///     Arc::new(TemplateSuggestionService::new()),
/// );
///
/// let gaps = certify.gaps().find_unverified().await?;
/// bridge.propose(&gaps).await;
/// for suggestion in bridge.pending().await {
///     bridge.approve(suggestion.id).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct RemediationBridge {
    service: Arc<dyn SuggestionService>,
    mutator: GraphMutator,
    pending: RwLock<Vec<RemediationSuggestion>>,
}

impl RemediationBridge {
    pub fn new(store: Arc<dyn GraphStore>, service: Arc<dyn SuggestionService>) -> Self {
        Self {
            service,
            mutator: GraphMutator::new(store),
            pending: RwLock::new(Vec::new()),
        }
    }

    /// Generates suggestions for `candidates` and queues them.
    ///
    /// Returns the number queued, which is less than `candidates.len()`
    /// when some proposals failed.
    pub async fn propose(&self, candidates: &[GapCandidate]) -> usize {
        let suggestions = generate_suggestions(self.service.as_ref(), candidates).await;
        let queued = suggestions.len();
        self.pending.write().await.extend(suggestions);
        queued
    }

    /// Suggestions awaiting review, oldest first.
    pub async fn pending(&self) -> Vec<RemediationSuggestion> {
        self.pending.read().await.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    /// Applies a suggestion and removes it from the queue.
    ///
    /// A suggestion whose mutation fails stays pending.
    pub async fn approve(&self, id: Uuid) -> Result<MutationOutcome> {
        let suggestion = self
            .pending
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AgentError::SuggestionNotFound(id.to_string()))?;

        let outcome = self.mutator.apply(&suggestion).await?;
        self.pending.write().await.retain(|s| s.id != id);
        Ok(outcome)
    }

    /// Approves every pending suggestion in queue order.
    ///
    /// Failures are logged and left pending.
    pub async fn approve_all(&self) -> Vec<MutationOutcome> {
        let ids: Vec<Uuid> = self.pending.read().await.iter().map(|s| s.id).collect();
        let mut outcomes = Vec::with_capacity(ids.len());

        for id in ids {
            match self.approve(id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!("Suggestion {} left pending: {}", id, e),
            }
        }
        outcomes
    }

    /// Drops a suggestion without applying it.
    pub async fn reject(&self, id: Uuid) -> Result<RemediationSuggestion> {
        let mut pending = self.pending.write().await;
        let index = pending
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AgentError::SuggestionNotFound(id.to_string()))?;
        Ok(pending.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certify_core::{Entity, EntityId, EntityKind, MemoryGraphStore};

    use crate::suggest::TemplateSuggestionService;

    fn candidate(id: &str) -> GapCandidate {
        GapCandidate {
            id: EntityId::new(id),
            text: format!("Text of {}", id),
        }
    }

    async fn bridge_over(reqs: &[&str]) -> (MemoryGraphStore, RemediationBridge) {
        let store = MemoryGraphStore::new();
        for req in reqs {
            store.merge_entity(Entity::new(EntityKind::Requirement, *req)).await.unwrap();
        }
        let bridge = RemediationBridge::new(
            Arc::new(store.clone()),
            Arc::new(TemplateSuggestionService::new()),
        );
        (store, bridge)
    }

    #[tokio::test]
    async fn test_approve_removes_from_queue() {
        let (store, bridge) = bridge_over(&["REQ-001", "REQ-002"]).await;
        assert_eq!(bridge.propose(&[candidate("REQ-001"), candidate("REQ-002")]).await, 2);

        let first = bridge.pending().await[0].id;
        let outcome = bridge.approve(first).await.unwrap();
        assert_eq!(outcome.req_id, "REQ-001");
        assert_eq!(outcome.test_id, "T-REQ-001");
        assert_eq!(bridge.pending_count().await, 1);
        assert_eq!(store.relation_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_stays_pending() {
        let (store, bridge) = bridge_over(&["REQ-001"]).await;
        bridge.propose(&[candidate("REQ-404")]).await;

        let id = bridge.pending().await[0].id;
        assert!(matches!(bridge.approve(id).await, Err(AgentError::MutationFailed(_))));
        assert_eq!(bridge.pending_count().await, 1);
        assert_eq!(store.entity_count(), 1);
    }

    #[tokio::test]
    async fn test_reject_and_unknown_ids() {
        let (_store, bridge) = bridge_over(&["REQ-001"]).await;
        bridge.propose(&[candidate("REQ-001")]).await;

        let id = bridge.pending().await[0].id;
        assert_eq!(bridge.reject(id).await.unwrap().req_id, "REQ-001");
        assert!(matches!(bridge.reject(id).await, Err(AgentError::SuggestionNotFound(_))));
        assert!(matches!(bridge.approve(id).await, Err(AgentError::SuggestionNotFound(_))));
    }

    #[tokio::test]
    async fn test_approve_all_keeps_failures() {
        let (store, bridge) = bridge_over(&["REQ-001", "REQ-003"]).await;
        bridge
            .propose(&[candidate("REQ-001"), candidate("REQ-002"), candidate("REQ-003")])
            .await;

        let outcomes = bridge.approve_all().await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(store.relation_count(), 2);

        let left = bridge.pending().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].req_id, "REQ-002");
    }
}
