//! Artifact ingestion - Loading a project directory into the graph.
//!
//! A project directory holds up to four plain-text artifacts:
//!
//! | File        | Format                                              | Produces                     |
//! |-------------|-----------------------------------------------------|------------------------------|
//! | `reg.txt`   | `[CLAUSE: <id>] <text>`                             | Regulation                   |
//! | `reqs.txt`  | `[REQ: <id>] [DERIVES_FROM: <reg>] <text>`          | Requirement, DERIVES_FROM    |
//! | `tests.csv` | `test_id,test_name,verifies_req,status`             | Test, VERIFIES               |
//! | `risk.csv`  | `risk_id,description,mitigated_by_req`              | Risk, MITIGATES              |
//!
//! Missing files are skipped with a warning. Lines that do not match are
//! ignored. Relations whose endpoints do not exist are skipped.

pub mod csv;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{CertifyError, Result};
use crate::graph::GraphStore;
use crate::types::{Entity, EntityKind, Relation, RelationKind};
use csv::CsvTable;

pub const REGULATIONS_FILE: &str = "reg.txt";
pub const REQUIREMENTS_FILE: &str = "reqs.txt";
pub const TESTS_FILE: &str = "tests.csv";
pub const RISKS_FILE: &str = "risk.csv";

fn clause_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[CLAUSE: (.*?)\] (.*)").expect("valid clause pattern"))
}

fn requirement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[REQ: (.*?)\] \[DERIVES_FROM: (.*?)\] (.*)").expect("valid requirement pattern")
    })
}

/// Counts of what an ingestion run merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub regulations: usize,
    pub requirements: usize,
    pub tests: usize,
    pub risks: usize,
    /// Relations newly created.
    pub relations: usize,
    /// Relations skipped because an endpoint was missing.
    pub skipped_relations: usize,
    /// Artifact files that were absent or unusable.
    pub skipped_files: Vec<String>,
}

/// Merges one project directory into `store`.
///
/// With `reset`, the store is cleared first. Regulations are read before
/// requirements, and requirements before tests and risks, so relations
/// between files resolve.
pub async fn ingest_project(store: &dyn GraphStore, dir: impl AsRef<Path>, reset: bool) -> Result<IngestStats> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CertifyError::Ingest(format!("{} is not a directory", dir.display())));
    }

    if reset {
        tracing::info!("Clearing graph before ingesting {}", dir.display());
        store.clear().await?;
    }

    let mut stats = IngestStats::default();

    if let Some(content) = read_artifact(dir, REGULATIONS_FILE, &mut stats).await? {
        ingest_regulations(store, &content, &mut stats).await?;
    }
    if let Some(content) = read_artifact(dir, REQUIREMENTS_FILE, &mut stats).await? {
        ingest_requirements(store, &content, &mut stats).await?;
    }
    if let Some(content) = read_artifact(dir, TESTS_FILE, &mut stats).await? {
        ingest_tests(store, &content, &mut stats).await?;
    }
    if let Some(content) = read_artifact(dir, RISKS_FILE, &mut stats).await? {
        ingest_risks(store, &content, &mut stats).await?;
    }

    tracing::info!(
        "Ingested {}: {} regulations, {} requirements, {} tests, {} risks, {} relations",
        dir.display(),
        stats.regulations,
        stats.requirements,
        stats.tests,
        stats.risks,
        stats.relations
    );
    Ok(stats)
}

async fn read_artifact(dir: &Path, name: &str, stats: &mut IngestStats) -> Result<Option<String>> {
    let path = dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found, skipping", path.display());
            stats.skipped_files.push(name.to_string());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Merges a relation, counting it as skipped when an endpoint is missing
/// or has the wrong kind.
async fn link(store: &dyn GraphStore, relation: Relation, stats: &mut IngestStats) -> Result<()> {
    match store.merge_relation(relation.clone()).await {
        Ok(created) => {
            if created {
                stats.relations += 1;
            }
            Ok(())
        }
        Err(CertifyError::EntityNotFound(reason)) | Err(CertifyError::InvalidRelation(reason)) => {
            tracing::debug!("Skipping {} {} -> {}: {}", relation.kind, relation.from, relation.to, reason);
            stats.skipped_relations += 1;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn ingest_regulations(store: &dyn GraphStore, content: &str, stats: &mut IngestStats) -> Result<()> {
    for line in content.lines() {
        let Some(caps) = clause_pattern().captures(line.trim_end()) else {
            continue;
        };
        store
            .merge_entity(Entity::new(EntityKind::Regulation, &caps[1]).with_attr("text", &caps[2]))
            .await?;
        stats.regulations += 1;
    }
    Ok(())
}

async fn ingest_requirements(store: &dyn GraphStore, content: &str, stats: &mut IngestStats) -> Result<()> {
    for line in content.lines() {
        let Some(caps) = requirement_pattern().captures(line.trim_end()) else {
            continue;
        };
        store
            .merge_entity(Entity::new(EntityKind::Requirement, &caps[1]).with_attr("text", &caps[3]))
            .await?;
        stats.requirements += 1;
        link(store, Relation::new(RelationKind::DerivesFrom, &caps[1], &caps[2]), stats).await?;
    }
    Ok(())
}

fn checked_table(content: &str, file: &str, required: &[&str], stats: &mut IngestStats) -> Option<CsvTable> {
    let table = CsvTable::parse(content);
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        Some(table)
    } else {
        tracing::warn!("{} lacks columns {:?}, skipping", file, missing);
        stats.skipped_files.push(file.to_string());
        None
    }
}

async fn ingest_tests(store: &dyn GraphStore, content: &str, stats: &mut IngestStats) -> Result<()> {
    let required = ["test_id", "test_name", "verifies_req", "status"];
    let Some(table) = checked_table(content, TESTS_FILE, &required, stats) else {
        return Ok(());
    };

    for record in table.records() {
        let Some(test_id) = record.get("test_id") else {
            continue;
        };
        let mut test = Entity::new(EntityKind::Test, test_id);
        if let Some(name) = record.get("test_name") {
            test = test.with_attr("name", name);
        }
        if let Some(status) = record.get("status") {
            test = test.with_attr("status", status);
        }
        store.merge_entity(test).await?;
        stats.tests += 1;

        if let Some(req_id) = record.get("verifies_req") {
            link(store, Relation::new(RelationKind::Verifies, test_id, req_id), stats).await?;
        }
    }
    Ok(())
}

async fn ingest_risks(store: &dyn GraphStore, content: &str, stats: &mut IngestStats) -> Result<()> {
    let required = ["risk_id", "description", "mitigated_by_req"];
    let Some(table) = checked_table(content, RISKS_FILE, &required, stats) else {
        return Ok(());
    };

    for record in table.records() {
        let Some(risk_id) = record.get("risk_id") else {
            continue;
        };
        let mut risk = Entity::new(EntityKind::Risk, risk_id);
        if let Some(description) = record.get("description") {
            risk = risk.with_attr("description", description);
        }
        store.merge_entity(risk).await?;
        stats.risks += 1;

        if let Some(req_id) = record.get("mitigated_by_req") {
            link(store, Relation::new(RelationKind::Mitigates, req_id, risk_id), stats).await?;
        }
    }
    Ok(())
}
