//! Query descriptions and record decoding for the graph query interface.
//!
//! A [`GraphQuery`] pairs a statement with bound parameters. Stores answer
//! with a sequence of [`Record`]s, each a map from field name to JSON value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CertifyError, Result};
use crate::types::{EntityKind, RelationKind};

/// A single result row: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Bound query parameters.
pub type Params = serde_json::Map<String, Value>;

/// The statements every graph store must answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatement {
    /// Every Requirement with `id`, `text` and one boolean flag per
    /// requested dimension (param `dimensions`).
    RequirementCoverage,
    /// Requirements with no incoming VERIFIES relation: `id`, `text`.
    UnverifiedRequirements,
    /// One record for requirement `id`: the requirement plus its
    /// regulations, tests, commits and risks.
    RequirementContext,
    /// All entities of `kind`: `id`, `kind` and their attributes.
    EntitiesOfKind,
    /// Tests with status FAIL and the requirement they verify:
    /// `test_id`, `req_id`.
    FailedVerifications,
}

/// A dimension requested from [`QueryStatement::RequirementCoverage`].
///
/// The store reports, under `name`, whether the requirement takes part in
/// at least one relation of kind `relation`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageDimension {
    pub name: String,
    pub relation: RelationKind,
}

/// A query description plus bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQuery {
    pub statement: QueryStatement,
    pub params: Params,
}

impl GraphQuery {
    pub fn new(statement: QueryStatement) -> Self {
        Self {
            statement,
            params: Params::new(),
        }
    }

    /// Binds a parameter (builder pattern).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn requirement_coverage(dimensions: &[CoverageDimension]) -> Self {
        let dims = serde_json::to_value(dimensions).unwrap_or(Value::Array(Vec::new()));
        Self::new(QueryStatement::RequirementCoverage).param("dimensions", dims)
    }

    pub fn unverified_requirements() -> Self {
        Self::new(QueryStatement::UnverifiedRequirements)
    }

    pub fn requirement_context(id: &str) -> Self {
        Self::new(QueryStatement::RequirementContext).param("id", id)
    }

    pub fn entities_of_kind(kind: EntityKind) -> Self {
        Self::new(QueryStatement::EntitiesOfKind).param("kind", kind.label())
    }

    pub fn failed_verifications() -> Self {
        Self::new(QueryStatement::FailedVerifications)
    }

    /// Canonical key for result caching.
    ///
    /// `Params` is ordered, so equal queries always produce equal keys.
    pub fn cache_key(&self) -> String {
        format!("{:?}:{}", self.statement, Value::Object(self.params.clone()))
    }

    /// Reads a required string parameter.
    pub fn str_param(&self, key: &str) -> Result<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| CertifyError::UpstreamQuery(
                format!("{:?} requires string parameter '{}'", self.statement, key)
            ))
    }

    /// Decodes the `dimensions` parameter of a coverage query.
    pub fn dimensions(&self) -> Result<Vec<CoverageDimension>> {
        let raw = self.params.get("dimensions").cloned().ok_or_else(|| {
            CertifyError::UpstreamQuery("coverage query requires 'dimensions'".to_string())
        })?;
        Ok(serde_json::from_value(raw)?)
    }
}

/// Reads a string field from a record.
pub fn record_str<'a>(record: &'a Record, field: &str) -> Result<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CertifyError::UpstreamQuery(format!("record missing string field '{}'", field)))
}

/// Reads a boolean field from a record.
pub fn record_bool(record: &Record, field: &str) -> Result<bool> {
    record
        .get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| CertifyError::UpstreamQuery(format!("record missing boolean field '{}'", field)))
}
