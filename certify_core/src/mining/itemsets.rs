//! Frequent itemset discovery (level-wise Apriori).

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::features::TransactionMatrix;

/// A set of item names, kept sorted so equal sets compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Itemset(Vec<String>);

impl Itemset {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
        items.sort();
        items.dedup();
        Self(items)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.binary_search_by(|i| i.as_str().cmp(item)).is_ok()
    }

    pub fn is_subset(&self, other: &Itemset) -> bool {
        self.0.iter().all(|item| other.contains(item))
    }
}

impl std::fmt::Display for Itemset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// An itemset whose support cleared the threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrequentItemset {
    pub items: Itemset,
    /// Fraction of rows containing every item.
    pub support: f64,
    /// Number of rows containing every item.
    pub count: usize,
}

/// Column-index itemsets with their row counts.
///
/// Keys are sorted column indices. Every subset of a key is also a key.
pub(crate) type CountTable = HashMap<Vec<usize>, usize>;

/// Enumerates every column subset whose support is at least `min_support`.
///
/// Level `k + 1` candidates are joined from frequent `k`-itemsets sharing a
/// `k - 1` prefix and dropped when any `k`-subset is infrequent.
pub(crate) fn apriori(matrix: &TransactionMatrix, min_support: f64) -> CountTable {
    let mut frequent = CountTable::new();
    let rows = matrix.row_count();
    if rows == 0 {
        return frequent;
    }

    let is_frequent = |count: usize| count > 0 && count as f64 / rows as f64 >= min_support;

    let mut level: Vec<Vec<usize>> = Vec::new();
    for column in 0..matrix.columns().len() {
        let count = matrix.support_count(&[column]);
        if is_frequent(count) {
            frequent.insert(vec![column], count);
            level.push(vec![column]);
        }
    }

    while !level.is_empty() {
        let known: HashSet<&Vec<usize>> = level.iter().collect();
        let mut next = Vec::new();

        for (i, a) in level.iter().enumerate() {
            for b in &level[i + 1..] {
                let k = a.len();
                if a[..k - 1] != b[..k - 1] {
                    continue;
                }
                let mut candidate = a.clone();
                candidate.push(b[k - 1]);

                if !all_subsets_known(&candidate, &known) {
                    continue;
                }

                let count = matrix.support_count(&candidate);
                if is_frequent(count) {
                    frequent.insert(candidate.clone(), count);
                    next.push(candidate);
                }
            }
        }

        level = next;
    }

    tracing::debug!("Apriori found {} frequent itemsets over {} rows", frequent.len(), rows);
    frequent
}

fn all_subsets_known(candidate: &[usize], known: &HashSet<&Vec<usize>>) -> bool {
    (0..candidate.len()).all(|skip| {
        let subset: Vec<usize> = candidate
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .map(|(_, &c)| c)
            .collect();
        known.contains(&subset)
    })
}

/// Resolves column indices to a named itemset.
pub(crate) fn named(matrix: &TransactionMatrix, columns: &[usize]) -> Itemset {
    Itemset::new(columns.iter().map(|&c| matrix.columns()[c].clone()))
}
