//! CertifyKit - Compliance gap mining over a traceability graph
//!
//! This crate provides the core engine for finding compliance gaps.
//!
//! # Overview
//!
//! CertifyKit reads a graph of regulations, requirements, tests, code
//! commits and risks, then surfaces requirements that break the patterns
//! the rest of the project follows:
//!
//! - **Feature extraction**: one transaction per requirement, recording
//!   whether it is verified, implemented and mitigating a risk
//! - **Pattern mining**: Apriori frequent itemsets and association rules
//!   that predict `HAS_TEST`
//! - **Exception finding**: requirements matching a rule's premise but
//!   lacking its conclusion
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use certify_core::Certify;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let certify = Certify::open_snapshot("./graph.json").await?;
//!
//!     let report = certify.gaps().discover().await?;
//!     for gap in &report.gaps {
//!         println!("{} violates {}", gap.entity_id, gap.violated_rule);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`]: Entities, relations and identifiers
//! - [`error`]: Error types for all operations
//! - [`graph`]: The graph store seam and typed queries
//! - [`storage`]: In-memory graph store with JSON snapshots
//! - [`cache`]: Query result caching
//! - [`features`]: Feature extraction and one-hot encoding
//! - [`mining`]: Frequent itemsets and association rules
//! - [`exceptions`]: Rule violations as gap records
//! - [`gaps`]: Gap discovery entry points
//! - [`ingest`]: Loading project artifacts into the graph
//! - [`config`]: Mining configuration

pub mod error;
pub mod types;

// Graph access
pub mod graph;
pub mod storage;
pub mod cache;

// Mining pipeline
pub mod features;
pub mod mining;
pub mod exceptions;
pub mod gaps;

pub mod ingest;
pub mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types
pub use config::MiningConfig;
pub use error::{CertifyError, Result};
pub use exceptions::{ExceptionFinder, GapRecord};
pub use features::{FeatureExtractor, FeatureTable, TransactionMatrix};
pub use gaps::{GapCandidate, GapReport};
pub use graph::GraphStore;
pub use mining::{AssociationRule, EmptyReason, PatternMiner, RuleSet};
pub use storage::MemoryGraphStore;
pub use types::{Entity, EntityId, EntityKind, GapId, Relation, RelationKind};

use cache::{CachedGraphStore, QueryCache};

/// Main entry point for CertifyKit.
///
/// Holds an injected graph store and the mining configuration. Cloning is
/// cheap and clones share the store.
///
/// # Examples
///
/// ```rust
/// use certify_core::{Certify, Entity, EntityKind, GraphStore};
///
/// # #[tokio::main]
/// # async fn main() -> certify_core::Result<()> {
/// let certify = Certify::in_memory();
/// certify.store().merge_entity(Entity::new(EntityKind::Requirement, "REQ-001")).await?;
///
/// let unverified = certify.gaps().find_unverified().await?;
/// assert_eq!(unverified.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Certify {
    store: Arc<dyn GraphStore>,
    config: Arc<MiningConfig>,
}

impl std::fmt::Debug for Certify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certify").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Certify {
    /// Creates an instance over `store`, validating `config`.
    pub fn new(store: Arc<dyn GraphStore>, config: MiningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    /// Creates an instance over an empty in-memory graph with default settings.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryGraphStore::new()),
            config: Arc::new(MiningConfig::default()),
        }
    }

    /// Opens a JSON graph snapshot with default settings.
    pub async fn open_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        CertifyBuilder::new().snapshot(path).build().await
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Returns the graph module for typed queries.
    pub fn graph(&self) -> graph::GraphModule {
        graph::GraphModule::new(self.store.clone())
    }

    /// Returns the gap module for mining and unverified-requirement queries.
    pub fn gaps(&self) -> gaps::GapModule {
        gaps::GapModule::new(self.store.clone(), self.config.clone())
    }

    /// Ingests a project directory into the store.
    pub async fn ingest(&self, dir: impl AsRef<Path>, reset: bool) -> Result<ingest::IngestStats> {
        ingest::ingest_project(self.store.as_ref(), dir, reset).await
    }
}

/// Builder for configuring and creating a [`Certify`] instance.
#[derive(Clone, Default)]
pub struct CertifyBuilder {
    store: Option<Arc<dyn GraphStore>>,
    snapshot: Option<PathBuf>,
    config: Option<MiningConfig>,
    cache_ttl: Option<Duration>,
}

impl CertifyBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing store. Takes precedence over [`snapshot`](Self::snapshot).
    pub fn store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Loads the graph from a JSON snapshot.
    pub fn snapshot(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config(mut self, config: MiningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Caches query results for `ttl`, clearing on every mutation.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Builds the instance, validating the configuration.
    pub async fn build(self) -> Result<Certify> {
        let store: Arc<dyn GraphStore> = match (self.store, self.snapshot) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(MemoryGraphStore::load(&path).await?),
            (None, None) => Arc::new(MemoryGraphStore::new()),
        };

        let store: Arc<dyn GraphStore> = match self.cache_ttl {
            Some(ttl) => Arc::new(CachedGraphStore::with_cache(store, QueryCache::new(1000, ttl))),
            None => store,
        };

        Certify::new(store, self.config.unwrap_or_default())
    }
}
