use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::ForestError;
use crate::node::{Impurity, Node, NodeIndex, majority_class};
use crate::split::{SplitCriterion, SplitRules, find_best_split};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Limit the tree to `d` levels below the root. `None` grows until leaves
    /// are pure or too small to split.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Number of randomly drawn features examined per split. `None` examines all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Seed for the per-split feature shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the stopping parameters independently of any data.
    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ForestError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }

    /// Fit a tree on a row-major feature matrix.
    ///
    /// `features[sample][feature]`, `labels[sample]` (zero-based classes).
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                            |
    /// |-----------------------------------------|-------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]           | `features` is empty                             |
    /// | [`ForestError::LabelCountMismatch`]     | `features.len() != labels.len()`                |
    /// | [`ForestError::ZeroFeatures`]           | rows have zero columns                          |
    /// | [`ForestError::FeatureCountMismatch`]   | rows have inconsistent lengths                  |
    /// | [`ForestError::NonFiniteValue`]         | any value is NaN or infinite                    |
    /// | [`ForestError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                        |
    /// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                         |
    /// | [`ForestError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                          |
    /// | [`ForestError::InvalidMaxFeatures`]     | `max_features` outside `[1, n_features]`        |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, ForestError> {
        let n_features = check_training_data(features, labels)?;
        self.validate()?;
        let columns = to_columns(features, n_features);
        let rows: Vec<usize> = (0..features.len()).collect();
        let n_classes = n_classes_of(labels);
        self.grow(&columns, labels, &rows, n_classes)
    }

    /// Grow a tree over `rows` of pre-validated column-major data.
    ///
    /// `rows` may repeat indices (bootstrap samples).
    pub(crate) fn grow(
        &self,
        columns: &[Vec<f64>],
        labels: &[usize],
        rows: &[usize],
        n_classes: usize,
    ) -> Result<DecisionTree, ForestError> {
        let n_features = columns.len();
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let mut builder = Builder {
            columns,
            labels,
            n_classes,
            config: self,
            rules: SplitRules {
                criterion: self.criterion,
                max_features,
                min_samples_leaf: self.min_samples_leaf,
            },
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(rows, 0);

        debug!(n_nodes = builder.arena.len(), n_classes, "decision tree grown");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            n_classes,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a training matrix and its labels, returning the column count.
pub(crate) fn check_training_data(
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<usize, ForestError> {
    if features.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    if features.len() != labels.len() {
        return Err(ForestError::LabelCountMismatch {
            n_rows: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Transpose a row-major matrix to `columns[feature][sample]`.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect()
}

pub(crate) fn n_classes_of(labels: &[usize]) -> usize {
    labels.iter().max().map_or(1, |&m| m + 1)
}

struct Builder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    config: &'a DecisionTreeConfig,
    rules: SplitRules,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl Builder<'_> {
    /// Depth-first construction; returns the index of the node for `rows`.
    fn build(&mut self, rows: &[usize], depth: usize) -> NodeIndex {
        let n_samples = rows.len();
        let mut class_counts = vec![0usize; self.n_classes];
        for &r in rows {
            class_counts[self.labels[r]] += 1;
        }
        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let stop = impurity.is_pure()
            || n_samples < self.config.min_samples_split
            || n_samples < 2 * self.config.min_samples_leaf
            || self.config.max_depth.is_some_and(|d| depth >= d);

        let split = if stop {
            None
        } else {
            find_best_split(
                self.columns,
                self.labels,
                rows,
                &class_counts,
                impurity,
                self.rules,
                &mut self.rng,
            )
        };

        let Some(split) = split else {
            return self.push_leaf(class_counts, impurity, n_samples);
        };

        // Reserve this node's slot so the root stays at index 0.
        let slot = self.arena.len();
        self.arena.push(Node::Leaf {
            class: 0,
            class_counts: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.build(&split.left, depth + 1);
        let right = self.build(&split.right, depth + 1);
        self.arena[slot] = Node::Branch {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            gain: split.gain,
        };
        NodeIndex::new(slot)
    }

    fn push_leaf(&mut self, class_counts: Vec<usize>, impurity: Impurity, n_samples: usize) -> NodeIndex {
        let slot = self.arena.len();
        self.arena.push(Node::Leaf {
            class: majority_class(&class_counts),
            class_counts,
            impurity,
            n_samples,
        });
        NodeIndex::new(slot)
    }
}

/// A fitted CART decision tree stored as a flat node arena.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class of one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        match self.leaf_for(sample)? {
            Node::Leaf { class, .. } => Ok(*class),
            Node::Branch { .. } => unreachable!("leaf_for always stops at a leaf"),
        }
    }

    /// Class distribution of the leaf the sample lands in (length `n_classes`).
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, ForestError> {
        match self.leaf_for(sample)? {
            Node::Leaf {
                class_counts,
                n_samples,
                ..
            } => {
                let total = (*n_samples).max(1) as f64;
                Ok(class_counts.iter().map(|&c| c as f64 / total).collect())
            }
            Node::Branch { .. } => unreachable!("leaf_for always stops at a leaf"),
        }
    }

    /// Predict every row, in parallel. Output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any row has the wrong width.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        features
            .into_par_iter()
            .map(|row| self.predict(row))
            .collect()
    }

    /// Mean-decrease-in-impurity importances, normalised to sum to 1.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Branch { feature, gain, .. } = node {
                totals[feature.index()] += gain;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Borrow a node by arena index.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Longest root-to-leaf path; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.subtree_depth(NodeIndex::ROOT)
    }

    pub(crate) fn subtree_depth(&self, root: NodeIndex) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match self.node(idx) {
                Node::Leaf { .. } => deepest = deepest.max(d),
                Node::Branch { left, right, .. } => {
                    stack.push((*left, d + 1));
                    stack.push((*right, d + 1));
                }
            }
        }
        deepest
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = NodeIndex::ROOT;
        loop {
            match self.node(idx) {
                leaf @ Node::Leaf { .. } => return Ok(leaf),
                Node::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}
