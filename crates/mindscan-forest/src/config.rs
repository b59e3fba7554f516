//! Configuration builder for random forest training.

use std::fmt;

use crate::error::ForestError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;
use crate::tree::DecisionTreeConfig;

/// How many features each split draws from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least 1.
    Sqrt,
    /// `floor(log2(n_features))`, at least 1.
    Log2,
    /// A fixed count.
    Fixed(usize),
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for a dataset with `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the count is 0 or
    /// exceeds `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let n = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => (n.sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => (n.log2().floor() as usize).max(1),
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Log2 => f.write_str("log2"),
            MaxFeatures::Fixed(k) => write!(f, "{k}"),
            MaxFeatures::All => f.write_str("None"),
        }
    }
}

/// Configuration for random forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default     |
/// |----------------------|-------------|
/// | `max_features`       | `Sqrt`      |
/// | `max_depth`          | `None`      |
/// | `min_samples_split`  | 2           |
/// | `min_samples_leaf`   | 1           |
/// | `criterion`          | `Gini`      |
/// | `seed`               | 42          |
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a config for an ensemble of `n_estimators` trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, ForestError> {
        if n_estimators == 0 {
            return Err(ForestError::InvalidTreeCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            seed: 42,
        })
    }

    /// Change the ensemble size.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Result<Self, ForestError> {
        if n_estimators == 0 {
            return Err(ForestError::InvalidTreeCount { n_estimators });
        }
        self.n_estimators = n_estimators;
        Ok(self)
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

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

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Master seed; per-tree seeds are drawn from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
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
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Tree template shared by every member of the ensemble (seed aside).
    pub(crate) fn tree_template(&self, max_features: usize) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_criterion(self.criterion)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(Some(max_features))
    }

    /// Train a forest on a row-major dataset.
    ///
    /// `feature_names` labels the importance table; it must have one entry
    /// per column.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                             |
    /// |-----------------------------------------|--------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]           | `features` is empty                              |
    /// | [`ForestError::LabelCountMismatch`]     | `features.len() != labels.len()`                 |
    /// | [`ForestError::ZeroFeatures`]           | rows have zero columns                           |
    /// | [`ForestError::FeatureCountMismatch`]   | rows have inconsistent lengths, or names disagree|
    /// | [`ForestError::NonFiniteValue`]         | any value is NaN or infinite                     |
    /// | [`ForestError::InvalidMaxFeatures`]     | resolved max_features outside `[1, n_features]`  |
    /// | stopping-parameter variants             | as for [`DecisionTreeConfig::fit`]               |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, ForestError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(ForestError::InvalidTreeCount { n_estimators: 0 })
        ));
        let config = RandomForestConfig::new(3).unwrap();
        assert!(config.with_n_estimators(0).is_err());
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(20).unwrap(), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(2).unwrap(), 1);
        assert_eq!(MaxFeatures::Log2.resolve(20).unwrap(), 4);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::All.resolve(7).unwrap(), 7);
        assert!(MaxFeatures::Fixed(8).resolve(7).is_err());
        assert!(MaxFeatures::Fixed(0).resolve(7).is_err());
    }

    #[test]
    fn builder_round_trips_settings() {
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_max_depth(Some(4))
            .with_criterion(SplitCriterion::Entropy)
            .with_max_features(MaxFeatures::Log2)
            .with_min_samples_leaf(3)
            .with_seed(7);
        assert_eq!(config.n_estimators(), 10);
        assert_eq!(config.max_depth(), Some(4));
        assert_eq!(config.criterion(), SplitCriterion::Entropy);
        assert_eq!(config.max_features(), MaxFeatures::Log2);
        assert_eq!(config.min_samples_leaf(), 3);
        assert_eq!(config.seed(), 7);
        assert_eq!(MaxFeatures::All.to_string(), "None");
    }
}
