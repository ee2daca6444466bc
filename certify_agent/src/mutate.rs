//! Mutation engine - Applies approved suggestions to the graph.
//!
//! Writes go through [`GraphStore`]'s merge operations, so applying the
//! same suggestion twice leaves one Test and one VERIFIES relation.

use std::sync::Arc;

use certify_core::graph::{GraphModule, GraphStore};
use certify_core::{Entity, EntityKind, Relation, RelationKind};
use tokio::sync::Mutex;

use crate::suggest::RemediationSuggestion;
use crate::{AgentError, Result};

/// What an applied suggestion changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationOutcome {
    pub req_id: String,
    pub test_id: String,
    /// Whether the VERIFIES relation was new
    pub relation_created: bool,
}

/// Single-writer graph mutator.
///
/// Clones share the write lock, so at most one suggestion is being
/// applied at any time.
#[derive(Clone)]
pub struct GraphMutator {
    store: Arc<dyn GraphStore>,
    lock: Arc<Mutex<()>>,
}

impl GraphMutator {
    /// Creates a new mutator over `store`.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Merges the suggested Test and links it to its requirement.
    ///
    /// Fails before writing anything if the requirement does not exist.
    pub async fn apply(&self, suggestion: &RemediationSuggestion) -> Result<MutationOutcome> {
        let _guard = self.lock.lock().await;

        let context = GraphModule::new(self.store.clone())
            .requirement_context(&suggestion.req_id)
            .await?;
        if context.requirement.is_none() {
            return Err(AgentError::MutationFailed(format!(
                "requirement {} does not exist",
                suggestion.req_id
            )));
        }

        let test = Entity::new(EntityKind::Test, suggestion.test_id.as_str())
            .with_attr("name", suggestion.test_name.as_str())
            .with_attr("status", suggestion.status.as_str());
        self.store.merge_entity(test).await?;

        let relation_created = self
            .store
            .merge_relation(Relation::new(
                RelationKind::Verifies,
                suggestion.test_id.as_str(),
                suggestion.req_id.as_str(),
            ))
            .await?;

        tracing::info!(
            "Applied {} -> {} (new relation: {})",
            suggestion.test_id,
            suggestion.req_id,
            relation_created
        );

        Ok(MutationOutcome {
            req_id: suggestion.req_id.clone(),
            test_id: suggestion.test_id.clone(),
            relation_created,
        })
    }
}
