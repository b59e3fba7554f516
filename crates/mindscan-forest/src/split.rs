use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Purity measure used to score candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitCriterion {
    /// `1 - Σ p²`
    #[default]
    Gini,
    /// `-Σ p·log₂(p)`
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node with the given per-class counts.
    ///
    /// An empty node is treated as pure.
    #[must_use]
    pub fn impurity(self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                1.0 - class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            SplitCriterion::Entropy => class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        };
        Impurity::new(value.max(0.0))
    }

    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SplitCriterion::Gini => "gini",
            SplitCriterion::Entropy => "entropy",
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gini" => Ok(SplitCriterion::Gini),
            "entropy" => Ok(SplitCriterion::Entropy),
            other => Err(format!("unknown criterion: {other} (expected gini or entropy)")),
        }
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitCandidate {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n·I(parent) − n_l·I(left) − n_r·I(right)`
    pub(crate) gain: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Search parameters shared by every node of one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitRules {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Find the best threshold split over `max_features` randomly drawn,
/// non-constant columns.
///
/// `columns` is column-major (`columns[feature][sample]`) and `rows` indexes
/// into it. For every drawn feature the rows are sorted by value and scanned
/// once, moving one sample at a time from the right child's class counts to
/// the left's. Thresholds sit halfway between consecutive distinct values.
/// The first candidate with the largest gain wins, even when that gain is
/// zero (an XOR root still splits).
///
/// Returns `None` when no split satisfies `min_samples_leaf` or every
/// feature is constant over `rows`.
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    rows: &[usize],
    parent_counts: &[usize],
    parent_impurity: Impurity,
    rules: SplitRules,
    rng: &mut impl Rng,
) -> Option<SplitCandidate> {
    let n_features = columns.len();
    let n = rows.len();
    if n < 2 || n_features == 0 {
        return None;
    }
    let n_classes = parent_counts.len();

    let parent_weighted = n as f64 * parent_impurity.value();
    let mut best: Option<(usize, f64, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);
    let mut order: Vec<usize> = (0..n_features).collect();
    let mut examined = 0;

    // Lazy Fisher-Yates: constant columns are skipped without counting
    // against `max_features`.
    for i in 0..n_features {
        if examined == rules.max_features {
            break;
        }
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
        let feature = order[i];

        let column = &columns[feature];
        sorted.clear();
        sorted.extend(rows.iter().map(|&r| (column[r], labels[r])));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if sorted[0].0 == sorted[n - 1].0 {
            continue;
        }
        examined += 1;

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.to_vec();

        for pos in 0..n - 1 {
            let (value, class) = sorted[pos];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let next = sorted[pos + 1].0;
            if value == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < rules.min_samples_leaf || n_right < rules.min_samples_leaf {
                continue;
            }

            let gain = parent_weighted
                - n_left as f64 * rules.criterion.impurity(&left_counts, n_left).value()
                - n_right as f64 * rules.criterion.impurity(&right_counts, n_right).value();

            if best.is_none_or(|(_, _, g)| gain > g) {
                let mut threshold = value + (next - value) / 2.0;
                // Midpoint can round up to `next` for adjacent floats.
                if threshold >= next {
                    threshold = value;
                }
                best = Some((feature, threshold, gain));
            }
        }
    }

    let (feature, threshold, gain) = best?;

    let column = &columns[feature];
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| column[r] <= threshold);

    Some(SplitCandidate {
        feature: FeatureIndex::new(feature),
        threshold,
        gain,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn rules(max_features: usize, min_samples_leaf: usize) -> SplitRules {
        SplitRules {
            criterion: SplitCriterion::Gini,
            max_features,
            min_samples_leaf,
        }
    }

    fn search(
        columns: &[Vec<f64>],
        labels: &[usize],
        rules: SplitRules,
    ) -> Option<SplitCandidate> {
        let rows: Vec<usize> = (0..labels.len()).collect();
        let mut counts = vec![0usize; 2];
        for &l in labels {
            counts[l] += 1;
        }
        let parent = rules.criterion.impurity(&counts, labels.len());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        find_best_split(columns, labels, &rows, &counts, parent, rules, &mut rng)
    }

    #[test]
    fn gini_values() {
        assert!(SplitCriterion::Gini.impurity(&[10, 0], 10).is_pure());
        let balanced = SplitCriterion::Gini.impurity(&[5, 5], 10);
        assert!((balanced.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_is_measured_in_bits() {
        let balanced = SplitCriterion::Entropy.impurity(&[4, 4], 8);
        assert!((balanced.value() - 1.0).abs() < 1e-12);
        let four_way = SplitCriterion::Entropy.impurity(&[1, 1, 1, 1], 4);
        assert!((four_way.value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn criterion_parses_case_insensitively() {
        assert_eq!("Gini".parse::<SplitCriterion>().unwrap(), SplitCriterion::Gini);
        assert_eq!("entropy".parse::<SplitCriterion>().unwrap(), SplitCriterion::Entropy);
        assert!("log_loss".parse::<SplitCriterion>().is_err());
        assert_eq!(SplitCriterion::Entropy.to_string(), "entropy");
    }

    #[test]
    fn picks_the_separating_feature() {
        let columns = vec![
            vec![0.3, 0.1, 0.4, 0.2, 0.5, 0.0],
            vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let split = search(&columns, &labels, rules(2, 1)).expect("split exists");
        assert_eq!(split.feature.index(), 1);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left, vec![0, 1, 2]);
        assert_eq!(split.right, vec![3, 4, 5]);
        assert!((split.gain - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_yields_nothing() {
        let columns = vec![vec![2.0; 4]];
        let labels = vec![0, 1, 0, 1];
        assert!(search(&columns, &labels, rules(1, 1)).is_none());
    }

    #[test]
    fn leaf_minimum_blocks_small_children() {
        let columns = vec![vec![1.0, 9.0]];
        let labels = vec![0, 1];
        assert!(search(&columns, &labels, rules(1, 2)).is_none());
        assert!(search(&columns, &labels, rules(1, 1)).is_some());
    }
}
