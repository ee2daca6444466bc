//! Common test utilities for CertifyKit integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use certify_core::features::{ColumnUniverse, FeatureDimension, FeatureVocabulary, TransactionMatrix};
use certify_core::{Entity, EntityKind, GraphStore, MemoryGraphStore, Relation, RelationKind};

/// Feature rows as (requirement id, items), ids numbered from `REQ-001`.
pub type Baskets = Vec<(String, Vec<&'static str>)>;

/// Appends `times` copies of `items` to `baskets`.
pub fn repeat(baskets: &mut Baskets, times: usize, items: &[&'static str]) {
    for _ in 0..times {
        let id = format!("REQ-{:03}", baskets.len() + 1);
        baskets.push((id, items.to_vec()));
    }
}

/// Vocabulary with only the test and risk dimensions.
pub fn test_risk_vocabulary() -> FeatureVocabulary {
    FeatureVocabulary::new(vec![
        FeatureDimension::new("test_status", RelationKind::Verifies, "HAS_TEST", "NO_TEST"),
        FeatureDimension::new("risk_status", RelationKind::Mitigates, "HAS_RISK", "NO_RISK"),
    ])
}

pub fn encode(vocabulary: &FeatureVocabulary, baskets: &Baskets) -> TransactionMatrix {
    TransactionMatrix::from_baskets(
        vocabulary,
        baskets.iter().map(|(id, items)| (id.as_str(), items.iter().copied())),
        ColumnUniverse::Vocabulary,
    )
    .unwrap()
}

/// Materialises baskets as a graph: one Requirement per row plus a Test,
/// CodeCommit or Risk for every `HAS_*` item.
pub async fn seed_graph(store: &MemoryGraphStore, baskets: &Baskets) {
    for (id, items) in baskets {
        store
            .merge_entity(Entity::new(EntityKind::Requirement, id.as_str()).with_attr("text", format!("Text of {}", id)))
            .await
            .unwrap();

        if items.contains(&"HAS_TEST") {
            let test = format!("T-{}", id);
            store.merge_entity(Entity::new(EntityKind::Test, test.as_str()).with_attr("status", "PASS")).await.unwrap();
            store.merge_relation(Relation::new(RelationKind::Verifies, test.as_str(), id.as_str())).await.unwrap();
        }
        if items.contains(&"HAS_CODE") {
            let commit = format!("c-{}", id);
            store.merge_entity(Entity::new(EntityKind::CodeCommit, commit.as_str())).await.unwrap();
            store.merge_relation(Relation::new(RelationKind::Implements, commit.as_str(), id.as_str())).await.unwrap();
        }
        if items.contains(&"HAS_RISK") {
            let risk = format!("RISK-{}", id);
            store.merge_entity(Entity::new(EntityKind::Risk, risk.as_str())).await.unwrap();
            store.merge_relation(Relation::new(RelationKind::Mitigates, id.as_str(), risk.as_str())).await.unwrap();
        }
    }
}

/// Creates a test file with the given content in the specified directory.
pub async fn create_test_file(dir: &Path, name: &str, content: &str) -> anyhow::Result<PathBuf> {
    let file_path = dir.join(name);
    tokio::fs::write(&file_path, content).await?;
    Ok(file_path)
}

/// Writes a small project: two regulations, four requirements, two tests
/// and two risks.
pub async fn create_test_project(dir: &Path) -> anyhow::Result<()> {
    create_test_file(
        dir,
        "reg.txt",
        "[CLAUSE: GDPR-32] Security of processing\n[CLAUSE: GDPR-30] Records of processing\n",
    )
    .await?;
    create_test_file(
        dir,
        "reqs.txt",
        "[REQ: REQ-001] [DERIVES_FROM: GDPR-32] Encrypt personal data at rest\n\
         [REQ: REQ-002] [DERIVES_FROM: GDPR-32] Encrypt personal data in transit\n\
         [REQ: REQ-003] [DERIVES_FROM: GDPR-30] Keep an audit log of access\n\
         [REQ: REQ-004] [DERIVES_FROM: GDPR-30] Retain logs for one year\n",
    )
    .await?;
    create_test_file(
        dir,
        "tests.csv",
        "test_id,test_name,verifies_req,status\n\
         T-101,test_encryption_at_rest,REQ-001,PASS\n\
         T-102,test_tls_enforced,REQ-002,FAIL\n",
    )
    .await?;
    create_test_file(
        dir,
        "risk.csv",
        "risk_id,description,mitigated_by_req\n\
         RISK-1,Data breach,REQ-001\n\
         RISK-2,Unauthorised access,REQ-003\n",
    )
    .await?;
    Ok(())
}
