//! Core types for CertifyKit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identifier for a compliance artifact.
///
/// Identifiers come from the source documents (`REQ-001`, `T-101`, a commit
/// hash) and are unique per entity kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Compliance artifact classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Regulation,
    Requirement,
    Test,
    CodeCommit,
    Risk,
}

impl EntityKind {
    /// Graph label used in records and snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regulation => "Regulation",
            Self::Requirement => "Requirement",
            Self::Test => "Test",
            Self::CodeCommit => "CodeCommit",
            Self::Risk => "Risk",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed, directed link between two entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    /// Requirement -> Regulation
    DerivesFrom,
    /// Test -> Requirement
    Verifies,
    /// CodeCommit -> Requirement
    Implements,
    /// Requirement -> Risk
    Mitigates,
}

impl RelationKind {
    /// Returns the (source, target) entity kinds this relation connects.
    pub fn endpoints(&self) -> (EntityKind, EntityKind) {
        match self {
            Self::DerivesFrom => (EntityKind::Requirement, EntityKind::Regulation),
            Self::Verifies => (EntityKind::Test, EntityKind::Requirement),
            Self::Implements => (EntityKind::CodeCommit, EntityKind::Requirement),
            Self::Mitigates => (EntityKind::Requirement, EntityKind::Risk),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DerivesFrom => "DERIVES_FROM",
            Self::Verifies => "VERIFIES",
            Self::Implements => "IMPLEMENTS",
            Self::Mitigates => "MITIGATES",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A compliance artifact in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier
    pub id: EntityId,
    /// Artifact kind
    pub kind: EntityKind,
    /// Kind-specific attributes (text, name, status, description, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute (builder pattern).
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Requirement and regulation text, empty when absent.
    pub fn text(&self) -> &str {
        self.attr("text").unwrap_or_default()
    }
}

/// A relation between two entities.
///
/// Endpoint kinds are implied by `kind`; see [`RelationKind::endpoints`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub from: EntityId,
    pub to: EntityId,
}

impl Relation {
    pub fn new(kind: RelationKind, from: impl Into<EntityId>, to: impl Into<EntityId>) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Stable identifier for a gap record.
///
/// This is a BLAKE3 hash of the violating entity and the violated rule, so
/// re-running the same mining pass yields the same identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GapId(pub [u8; 16]);

impl GapId {
    pub fn derive(entity: &EntityId, rule_statement: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(entity.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(rule_statement.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }
}

impl std::fmt::Display for GapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for GapId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
