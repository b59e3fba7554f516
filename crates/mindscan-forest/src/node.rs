use std::fmt;

/// Zero-based column position in the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the column position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x[{}]", self.0)
    }
}

/// Position of a node inside a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root is always the first node pushed into the arena.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node impurity under the criterion the tree was grown with.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when every sample at the node has the same class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// A node of a fitted CART tree.
///
/// Children are referenced by [`NodeIndex`] into the owning tree's arena,
/// so a whole tree is one flat `Vec<Node>`.
#[derive(Debug, Clone)]
pub enum Node {
    /// Interior node: samples with `x[feature] <= threshold` go left.
    Branch {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        n_samples: usize,
        /// Weighted impurity decrease contributed by this split.
        gain: f64,
    },
    /// Terminal node.
    Leaf {
        /// Majority class; ties resolve to the lowest class index.
        class: usize,
        /// Training samples per class that reached this leaf.
        class_counts: Vec<usize>,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    /// Impurity at this node (before splitting, for branches).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Branch { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Branch { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Index of the largest count, preferring the lowest index on ties.
pub(crate) fn majority_class(class_counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in class_counts.iter().enumerate() {
        if count > class_counts[best] {
            best = class;
        }
    }
    best
}
