//! Prediction for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Averaged class probabilities for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Most probable class; ties go to the lowest class index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (class, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class of one sample from the averaged tree distributions.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Mean of the per-tree leaf distributions.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut probs = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in probs.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        Ok(ClassDistribution { probs })
    }

    /// Predict every row in parallel; output order matches input order.
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

    /// Probability distributions for every row, in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any row has the wrong width.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        features
            .into_par_iter()
            .map(|row| self.predict_proba(row))
            .collect()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Members of the ensemble, in seed order.
    #[must_use]
    pub fn trees(&self) -> &[crate::tree::DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaxFeatures, RandomForestConfig};

    fn fitted() -> (RandomForest, Vec<Vec<f64>>) {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 20)).collect();
        let names = vec!["t".to_string(), "m".to_string()];
        let forest = RandomForestConfig::new(15)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        (forest, features)
    }

    #[test]
    fn distribution_argmax_prefers_lowest_on_tie() {
        let d = ClassDistribution { probs: vec![0.5, 0.5] };
        assert_eq!(d.predicted_class(), 0);
        let d = ClassDistribution { probs: vec![0.2, 0.8] };
        assert_eq!(d.predicted_class(), 1);
    }

    #[test]
    fn batch_matches_single_predictions() {
        let (forest, features) = fitted();
        let batch = forest.predict_batch(&features).unwrap();
        assert_eq!(batch.len(), features.len());
        for (row, &p) in features.iter().zip(&batch) {
            assert_eq!(forest.predict(row).unwrap(), p);
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (forest, features) = fitted();
        for dist in forest.predict_proba_batch(&features).unwrap() {
            let total: f64 = dist.as_slice().iter().sum();
            assert!((total - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn wrong_width_rejected() {
        let (forest, _) = fitted();
        assert!(matches!(
            forest.predict(&[1.0]).unwrap_err(),
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }
}
