//! In-memory graph store.
//!
//! This module provides a [`GraphStore`] backed by ordered maps behind a
//! `parking_lot::RwLock`, with JSON snapshot persistence.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CertifyError, Result};
use crate::graph::queries::{GraphQuery, QueryStatement, Record};
use crate::graph::GraphStore;
use crate::types::{Entity, EntityId, EntityKind, Relation, RelationKind};

/// Serializable dump of a whole graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Default)]
struct GraphState {
    entities: BTreeMap<(EntityKind, EntityId), Entity>,
    relations: BTreeSet<Relation>,
}

impl GraphState {
    fn contains(&self, kind: EntityKind, id: &EntityId) -> bool {
        self.entities.contains_key(&(kind, id.clone()))
    }

    fn get(&self, kind: EntityKind, id: &EntityId) -> Option<&Entity> {
        self.entities.get(&(kind, id.clone()))
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities
            .range((kind, EntityId::new(""))..)
            .take_while(move |((k, _), _)| *k == kind)
            .map(|(_, entity)| entity)
    }

    /// Requirement-side incidences: (relation kind, requirement id).
    fn requirement_incidence(&self) -> HashSet<(RelationKind, &EntityId)> {
        self.relations
            .iter()
            .map(|rel| {
                let (from_kind, _) = rel.kind.endpoints();
                if from_kind == EntityKind::Requirement {
                    (rel.kind, &rel.from)
                } else {
                    (rel.kind, &rel.to)
                }
            })
            .collect()
    }

    /// Entities on the far side of a requirement's relations of `kind`.
    fn neighbors(&self, req: &EntityId, kind: RelationKind) -> Vec<Value> {
        let (from_kind, to_kind) = kind.endpoints();
        self.relations
            .iter()
            .filter(|rel| rel.kind == kind)
            .filter_map(|rel| {
                if from_kind == EntityKind::Requirement && &rel.from == req {
                    self.get(to_kind, &rel.to)
                } else if to_kind == EntityKind::Requirement && &rel.to == req {
                    self.get(from_kind, &rel.from)
                } else {
                    None
                }
            })
            .filter_map(|entity| serde_json::to_value(entity).ok())
            .collect()
    }
}

/// Graph store held entirely in memory.
///
/// Cloning is cheap and clones share the same graph.
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl std::fmt::Debug for MemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryGraphStore")
            .field("entities", &state.entities.len())
            .field("relations", &state.relations.len())
            .finish()
    }
}

impl MemoryGraphStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot, validating every relation.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let store = Self::new();
        {
            let mut state = store.state.write();
            for entity in snapshot.entities {
                merge_into(&mut state, entity);
            }
            for relation in snapshot.relations {
                check_endpoints(&state, &relation)?;
                state.relations.insert(relation);
            }
        }
        Ok(store)
    }

    /// Loads a JSON snapshot from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: GraphSnapshot = serde_json::from_str(&raw)?;
        tracing::debug!(
            "Loaded snapshot {} ({} entities, {} relations)",
            path.as_ref().display(),
            snapshot.entities.len(),
            snapshot.relations.len()
        );
        Self::from_snapshot(snapshot)
    }

    /// Writes the current graph as a JSON snapshot.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    /// Returns a point-in-time copy of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read();
        GraphSnapshot {
            entities: state.entities.values().cloned().collect(),
            relations: state.relations.iter().cloned().collect(),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.state.read().relations.len()
    }

    fn execute(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        let state = self.state.read();
        match query.statement {
            QueryStatement::RequirementCoverage => {
                let dimensions = query.dimensions()?;
                let incidence = state.requirement_incidence();
                Ok(state
                    .of_kind(EntityKind::Requirement)
                    .map(|req| {
                        let mut record = base_record(req);
                        for dim in &dimensions {
                            let present = incidence.contains(&(dim.relation, &req.id));
                            record.insert(dim.name.clone(), Value::Bool(present));
                        }
                        record
                    })
                    .collect())
            }
            QueryStatement::UnverifiedRequirements => {
                let incidence = state.requirement_incidence();
                Ok(state
                    .of_kind(EntityKind::Requirement)
                    .filter(|req| !incidence.contains(&(RelationKind::Verifies, &req.id)))
                    .map(base_record)
                    .collect())
            }
            QueryStatement::RequirementContext => {
                let id = EntityId::new(query.str_param("id")?);
                let Some(req) = state.get(EntityKind::Requirement, &id) else {
                    return Ok(Vec::new());
                };
                let mut record = Record::new();
                record.insert("requirement".to_string(), serde_json::to_value(req)?);
                record.insert("regulations".to_string(), Value::Array(state.neighbors(&id, RelationKind::DerivesFrom)));
                record.insert("tests".to_string(), Value::Array(state.neighbors(&id, RelationKind::Verifies)));
                record.insert("commits".to_string(), Value::Array(state.neighbors(&id, RelationKind::Implements)));
                record.insert("risks".to_string(), Value::Array(state.neighbors(&id, RelationKind::Mitigates)));
                Ok(vec![record])
            }
            QueryStatement::EntitiesOfKind => {
                let kind: EntityKind = serde_json::from_value(Value::from(query.str_param("kind")?))?;
                Ok(state
                    .of_kind(kind)
                    .map(|entity| {
                        let mut record = Record::new();
                        record.insert("id".to_string(), Value::from(entity.id.as_str()));
                        record.insert("kind".to_string(), Value::from(kind.label()));
                        for (key, value) in &entity.attributes {
                            record.insert(key.clone(), Value::from(value.as_str()));
                        }
                        record
                    })
                    .collect())
            }
            QueryStatement::FailedVerifications => Ok(state
                .relations
                .iter()
                .filter(|rel| rel.kind == RelationKind::Verifies)
                .filter(|rel| {
                    state
                        .get(EntityKind::Test, &rel.from)
                        .and_then(|test| test.attr("status"))
                        .is_some_and(|status| status.eq_ignore_ascii_case("FAIL"))
                })
                .map(|rel| {
                    let mut record = Record::new();
                    record.insert("test_id".to_string(), Value::from(rel.from.as_str()));
                    record.insert("req_id".to_string(), Value::from(rel.to.as_str()));
                    record
                })
                .collect()),
        }
    }
}

fn base_record(entity: &Entity) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(entity.id.as_str()));
    record.insert("text".to_string(), Value::from(entity.text()));
    record
}

fn merge_into(state: &mut GraphState, entity: Entity) {
    match state.entities.get_mut(&(entity.kind, entity.id.clone())) {
        Some(existing) => existing.attributes.extend(entity.attributes),
        None => {
            state.entities.insert((entity.kind, entity.id.clone()), entity);
        }
    }
}

fn check_endpoints(state: &GraphState, relation: &Relation) -> Result<()> {
    let (from_kind, to_kind) = relation.kind.endpoints();
    check_endpoint(state, relation, from_kind, &relation.from)?;
    check_endpoint(state, relation, to_kind, &relation.to)
}

/// `EntityNotFound` when no entity has the id, `InvalidRelation` when only
/// entities of other kinds do.
fn check_endpoint(state: &GraphState, relation: &Relation, kind: EntityKind, id: &EntityId) -> Result<()> {
    if state.contains(kind, id) {
        return Ok(());
    }
    match state.entities.keys().find(|(_, existing)| existing == id) {
        Some((other, _)) => Err(CertifyError::InvalidRelation(format!(
            "{} expects {} {}, found {}",
            relation.kind, kind, id, other
        ))),
        None => Err(CertifyError::EntityNotFound(format!("{} {}", kind, id))),
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn run_query(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        self.execute(query)
    }

    async fn merge_entity(&self, entity: Entity) -> Result<()> {
        let mut state = self.state.write();
        merge_into(&mut state, entity);
        Ok(())
    }

    async fn merge_relation(&self, relation: Relation) -> Result<bool> {
        let mut state = self.state.write();
        check_endpoints(&state, &relation)?;
        Ok(state.relations.insert(relation))
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write();
        state.entities.clear();
        state.relations.clear();
        Ok(())
    }
}
