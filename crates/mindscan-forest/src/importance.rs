//! Impurity-based feature importance across an ensemble.

use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// One row of the importance table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FeatureImportance {
    pub name: String,
    /// Share of the total impurity decrease; the table sums to 1.0.
    pub importance: f64,
    /// 1 = most important.
    pub rank: usize,
}

/// Average per-tree importances, renormalise, and sort descending.
///
/// Equal importances keep column order. Trees that never split contribute
/// zeros; if no tree split at all every importance is 0.0.
pub(crate) fn rank_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<FeatureImportance> {
    let mut totals = vec![0.0f64; names.len()];
    for tree in per_tree {
        for (total, &v) in totals.iter_mut().zip(tree) {
            *total += v;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut table: Vec<FeatureImportance> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| FeatureImportance {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    table.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, row) in table.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    table
}

impl RandomForest {
    /// Ranked mean-decrease-in-impurity table over every tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        let per_tree: Vec<Vec<f64>> = self.trees.iter().map(DecisionTree::feature_importances).collect();
        rank_importances(&per_tree, &self.feature_names)
    }
}
