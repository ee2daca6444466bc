//! Graph module - The graph store seam and typed queries over it.
//!
//! The datastore itself is an external collaborator. Everything in
//! CertifyKit reaches it through [`GraphStore`], which is injected rather
//! than read from process-wide state.

pub mod queries;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Entity, EntityKind, Relation};
use queries::{record_str, GraphQuery, Record};

/// Query and mutation interface of a labeled property graph.
///
/// Mutations use merge-by-identifier semantics: re-applying the same
/// entity or relation never creates duplicates.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Runs a query and returns its records.
    async fn run_query(&self, query: &GraphQuery) -> Result<Vec<Record>>;

    /// Creates the entity or updates the attributes of an existing one.
    async fn merge_entity(&self, entity: Entity) -> Result<()>;

    /// Creates the relation if absent. Returns `true` when it was created.
    ///
    /// Both endpoints must already exist.
    async fn merge_relation(&self, relation: Relation) -> Result<bool>;

    /// Removes every entity and relation.
    async fn clear(&self) -> Result<()>;
}

/// Evidence gathered around a single requirement.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RequirementContext {
    pub requirement: Option<Entity>,
    pub regulations: Vec<Entity>,
    pub tests: Vec<Entity>,
    pub commits: Vec<Entity>,
    pub risks: Vec<Entity>,
}

/// A failing test linked to the requirement it verifies.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FailedVerification {
    pub test_id: String,
    pub req_id: String,
}

/// Typed access to the graph store.
///
/// # Examples
///
/// See crate-level documentation for usage examples.
#[derive(Clone)]
pub struct GraphModule {
    store: Arc<dyn GraphStore>,
}

impl GraphModule {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Get the underlying store for advanced operations
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Runs a raw query against the store.
    pub async fn query(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        self.store.run_query(query).await
    }

    /// Lists all entities of a kind, ordered by identifier.
    pub async fn entities(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let records = self.store.run_query(&GraphQuery::entities_of_kind(kind)).await?;
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            let mut entity = Entity::new(kind, record_str(&record, "id")?);
            for (key, value) in &record {
                if key == "id" || key == "kind" {
                    continue;
                }
                if let Some(text) = value.as_str() {
                    entity.attributes.insert(key.clone(), text.to_string());
                }
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Gathers the regulations, tests, commits and risks around a requirement.
    ///
    /// Returns an empty context if the requirement does not exist.
    pub async fn requirement_context(&self, id: &str) -> Result<RequirementContext> {
        let records = self.store.run_query(&GraphQuery::requirement_context(id)).await?;
        match records.into_iter().next() {
            Some(record) => Ok(serde_json::from_value(serde_json::Value::Object(record))?),
            None => Ok(RequirementContext::default()),
        }
    }

    /// Lists failing tests and the requirements they verify.
    pub async fn failed_verifications(&self) -> Result<Vec<FailedVerification>> {
        let records = self.store.run_query(&GraphQuery::failed_verifications()).await?;
        records
            .iter()
            .map(|record| {
                Ok(FailedVerification {
                    test_id: record_str(record, "test_id")?.to_string(),
                    req_id: record_str(record, "req_id")?.to_string(),
                })
            })
            .collect()
    }
}
