//! E2E Wave 1: Rule Mining & Exception Finding
//!
//! Mining runs over hand-built transaction tables with known outcomes.

use certify_core::features::FeatureVocabulary;
use certify_core::mining::{EmptyReason, Itemset, PatternMiner};
use certify_core::ExceptionFinder;

use crate::common::{encode, repeat, test_risk_vocabulary, Baskets};

/// E2E Test 1: A weak pattern toward HAS_TEST is not accepted
#[test]
fn e2e_low_confidence_rule_rejected() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 8, &["NO_TEST", "HAS_CODE", "NO_RISK"]);
    repeat(&mut baskets, 2, &["HAS_TEST", "HAS_CODE", "NO_RISK"]);
    let matrix = encode(&FeatureVocabulary::default(), &baskets);

    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();

    // {HAS_CODE} -> {HAS_TEST} only holds 2 times in 10
    assert!(rules.is_empty(), "no rule should predict HAS_TEST");
    assert_eq!(rules.empty_reason, Some(EmptyReason::NoTargetRules));

    let gaps = ExceptionFinder::new().find_exceptions(&matrix, rules.rules()).unwrap();
    assert!(gaps.is_empty());
}

/// E2E Test 2: A strong risk → test pattern yields exactly one gap
#[test]
fn e2e_single_rule_single_exception() {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 9, &["HAS_RISK", "HAS_TEST"]);
    repeat(&mut baskets, 1, &["HAS_RISK", "NO_TEST"]);
    repeat(&mut baskets, 5, &["NO_RISK", "NO_TEST"]);
    let matrix = encode(&test_risk_vocabulary(), &baskets);

    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();
    assert_eq!(rules.len(), 1);

    let rule = &rules.rules()[0];
    assert_eq!(rule.antecedent, Itemset::new(["HAS_RISK"]));
    assert_eq!(rule.consequent, Itemset::new(["HAS_TEST"]));
    assert!((rule.confidence - 0.9).abs() < 1e-9);
    assert!((rule.support - 9.0 / 15.0).abs() < 1e-9);

    let gaps = ExceptionFinder::new().find_exceptions(&matrix, rules.rules()).unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].entity_id.as_str(), "REQ-010");
    assert_eq!(gaps[0].violated_rule, "IF [HAS_RISK] THEN [HAS_TEST]");
    assert!((gaps[0].confidence - 0.9).abs() < 1e-9);
}

/// E2E Test 3: An empty table mines to nothing without error
#[test]
fn e2e_empty_table() {
    let matrix = encode(&FeatureVocabulary::default(), &Baskets::new());

    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();
    assert!(rules.is_empty());
    assert_eq!(rules.empty_reason, Some(EmptyReason::NoRows));

    let gaps = ExceptionFinder::new().find_exceptions(&matrix, rules.rules()).unwrap();
    assert!(gaps.is_empty());
}

fn two_rule_baskets() -> Baskets {
    let mut baskets = Baskets::new();
    repeat(&mut baskets, 4, &["HAS_TEST", "HAS_CODE", "NO_RISK"]);
    repeat(&mut baskets, 4, &["HAS_TEST", "NO_CODE", "HAS_RISK"]);
    repeat(&mut baskets, 1, &["NO_TEST", "HAS_CODE", "HAS_RISK"]);
    baskets
}

/// E2E Test 4: A row violating two rules is reported once per rule
#[test]
fn e2e_row_violating_two_rules() {
    let matrix = encode(&FeatureVocabulary::default(), &two_rule_baskets());
    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();

    let gaps = ExceptionFinder::new().find_exceptions(&matrix, rules.rules()).unwrap();
    assert_eq!(gaps.len(), 2);
    assert!(gaps.iter().all(|g| g.entity_id.as_str() == "REQ-009"));

    let violated: Vec<&str> = gaps.iter().map(|g| g.violated_rule.as_str()).collect();
    assert_eq!(violated, vec!["IF [HAS_CODE] THEN [HAS_TEST]", "IF [HAS_RISK] THEN [HAS_TEST]"]);
    assert_ne!(gaps[0].id, gaps[1].id);
}

/// E2E Test 5: Deduplication by entity keeps the first violated rule
#[test]
fn e2e_dedup_by_entity() {
    let matrix = encode(&FeatureVocabulary::default(), &two_rule_baskets());
    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();

    let gaps = ExceptionFinder::new()
        .dedup_by_entity(true)
        .find_exceptions(&matrix, rules.rules())
        .unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].violated_rule, "IF [HAS_CODE] THEN [HAS_TEST]");
}

/// E2E Test 6: Rules are ordered by confidence, then antecedent
#[test]
fn e2e_rule_order() {
    let matrix = encode(&FeatureVocabulary::default(), &two_rule_baskets());
    let rules = PatternMiner::default().discover_rules(&matrix).unwrap();

    assert!(rules.rules().windows(2).all(|w| w[0].confidence >= w[1].confidence));
    let last = rules.rules().last().unwrap();
    assert_eq!(last.antecedent, Itemset::new(["HAS_RISK"]));
    assert!((last.confidence - 0.8).abs() < 1e-9);
}

/// E2E Test 7: Mining is repeatable
#[test]
fn e2e_mining_is_deterministic() {
    let matrix = encode(&FeatureVocabulary::default(), &two_rule_baskets());
    let miner = PatternMiner::default();

    let first = miner.discover_rules(&matrix).unwrap();
    let second = miner.discover_rules(&matrix).unwrap();
    assert_eq!(first, second);

    let finder = ExceptionFinder::new();
    assert_eq!(
        finder.find_exceptions(&matrix, first.rules()).unwrap(),
        finder.find_exceptions(&matrix, second.rules()).unwrap()
    );
}
