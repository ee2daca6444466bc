//! E2E Wave 2: Graph-to-Gaps Pipeline
//!
//! Tests that run feature extraction, mining and exception finding
//! against a populated graph store.

use std::sync::Arc;

use certify_core::features::ColumnUniverse;
use certify_core::{Certify, CertifyBuilder, EmptyReason, GraphStore, MemoryGraphStore, MiningConfig};

use crate::common::{repeat, seed_graph, test_risk_vocabulary, Baskets};

async fn certify_over(baskets: &Baskets, config: MiningConfig) -> Certify {
    let store = MemoryGraphStore::new();
    seed_graph(&store, baskets).await;
    Certify::new(Arc::new(store), config).unwrap()
}

/// E2E Test 1: Gaps found in the graph carry requirement text
#[tokio::test]
async fn e2e_discover_gaps_from_graph() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 9, &["HAS_RISK", "HAS_TEST"]);
    repeat(&mut baskets, 1, &["HAS_RISK", "NO_TEST"]);
    repeat(&mut baskets, 5, &["NO_RISK", "NO_TEST"]);

    let certify = certify_over(&baskets, MiningConfig::new().vocabulary(test_risk_vocabulary())).await;
    let report = certify.gaps().discover().await.unwrap();

    assert_eq!(report.row_count, 15);
    assert_eq!(report.rules.len(), 1);
    assert_eq!(report.gaps.len(), 1);

    let candidates = report.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id.as_str(), "REQ-010");
    assert_eq!(candidates[0].text, "Text of REQ-010");
}

/// E2E Test 2: With no usable rules the deterministic engine still finds gaps
#[tokio::test]
async fn e2e_fallback_to_unverified() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 8, &["NO_TEST", "HAS_CODE", "NO_RISK"]);
    repeat(&mut baskets, 2, &["HAS_TEST", "HAS_CODE", "NO_RISK"]);

    let certify = certify_over(&baskets, MiningConfig::default()).await;
    let report = certify.gaps().discover().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.rules.empty_reason, Some(EmptyReason::NoTargetRules));

    let unverified = certify.gaps().find_unverified().await.unwrap();
    assert_eq!(unverified.len(), 8);
    assert_eq!(unverified[0].id.as_str(), "REQ-001");
}

/// E2E Test 3: Mining never writes to the graph
#[tokio::test]
async fn e2e_mining_is_read_only() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 9, &["HAS_TEST", "HAS_CODE", "HAS_RISK"]);
    repeat(&mut baskets, 1, &["NO_TEST", "HAS_CODE", "HAS_RISK"]);

    let store = MemoryGraphStore::new();
    seed_graph(&store, &baskets).await;
    let before = store.snapshot();

    let certify = Certify::new(Arc::new(store.clone()), MiningConfig::default()).unwrap();
    let report = certify.gaps().discover().await.unwrap();
    assert_eq!(report.gaps.len(), 3);

    assert_eq!(store.snapshot(), before);
}

/// E2E Test 4: Observed columns drop items no requirement takes
#[tokio::test]
async fn e2e_observed_column_universe() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 3, &["HAS_TEST", "NO_CODE", "NO_RISK"]);
    repeat(&mut baskets, 1, &["NO_TEST", "NO_CODE", "NO_RISK"]);

    let config = MiningConfig::new().column_universe(ColumnUniverse::Observed);
    let certify = certify_over(&baskets, config).await;

    let table = certify.gaps().extract_features().await.unwrap();
    let matrix = table.encode(ColumnUniverse::Observed).unwrap();
    assert_eq!(matrix.columns(), &["HAS_TEST", "NO_TEST", "NO_CODE", "NO_RISK"]);

    let report = certify.gaps().discover().await.unwrap();
    let violators: Vec<&str> = report.gaps.iter().map(|g| g.entity_id.as_str()).collect();
    assert!(violators.iter().all(|id| *id == "REQ-004"));
    assert_eq!(violators.len(), 3);
}

/// E2E Test 5: Cached stores see writes made through them
#[tokio::test]
async fn e2e_cached_store_after_write() {
    let memory = MemoryGraphStore::new();
    let certify = CertifyBuilder::new()
        .store(Arc::new(memory))
        .cache_ttl(std::time::Duration::from_secs(300))
        .build()
        .await
        .unwrap();

    let mut baskets = Baskets::new();
    repeat(&mut baskets, 2, &["NO_TEST", "NO_CODE", "NO_RISK"]);
    for (id, _) in &baskets {
        certify
            .store()
            .merge_entity(certify_core::Entity::new(certify_core::EntityKind::Requirement, id.as_str()))
            .await
            .unwrap();
        assert!(!certify.gaps().find_unverified().await.unwrap().is_empty());
    }
    assert_eq!(certify.gaps().find_unverified().await.unwrap().len(), 2);
}
