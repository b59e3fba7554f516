//! Stratified k-fold cross-validation.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::ForestError;
use crate::metrics::Scoring;
use crate::model::ModelSpec;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Fold membership for every row of one label vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folds {
    assignments: Vec<usize>,
    n_folds: usize,
}

/// Per-fold scores of one model spec.
#[derive(Debug, Clone, Serialize)]
pub struct CvScore {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of `fold_scores`.
    pub std: f64,
}

impl CvScore {
    fn from_folds(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len() as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let std = (fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();
        Self {
            fold_scores,
            mean,
            std,
        }
    }
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, ForestError> {
        if n_folds < 2 {
            return Err(ForestError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Assign rows to folds.
    ///
    /// Groups samples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero labels |
    /// | [`ForestError::TooFewSamplesForFolds`] | A class has fewer samples than folds |
    pub fn folds(&self, labels: &[usize]) -> Result<Folds, ForestError> {
        if labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(ForestError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                assignments[idx] = j % self.n_folds;
            }
        }

        Ok(Folds {
            assignments,
            n_folds: self.n_folds,
        })
    }

    /// Score one spec with k-fold CV.
    ///
    /// # Errors
    ///
    /// Fold errors from [`CrossValidation::folds`], plus any training or
    /// scoring error.
    pub fn score(
        &self,
        spec: &ModelSpec,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        scoring: Scoring,
    ) -> Result<CvScore, ForestError> {
        if features.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }
        self.folds(labels)?
            .score(spec, features, labels, feature_names, scoring)
    }
}

impl Folds {
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Fold index of every row.
    #[must_use]
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// `(train_rows, validation_rows)` for `fold`.
    #[must_use]
    pub fn split(&self, fold: usize) -> (Vec<usize>, Vec<usize>) {
        (0..self.assignments.len()).partition(|&i| self.assignments[i] != fold)
    }

    /// Train on k-1 folds, score the held-out fold, rotate.
    ///
    /// # Errors
    ///
    /// Any training or scoring error; the first failing fold aborts.
    #[instrument(skip_all, fields(model = spec.kind(), n_folds = self.n_folds))]
    pub fn score(
        &self,
        spec: &ModelSpec,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        scoring: Scoring,
    ) -> Result<CvScore, ForestError> {
        let mut fold_scores = Vec::with_capacity(self.n_folds);
        for fold in 0..self.n_folds {
            let (train, held_out) = self.split(fold);
            let take = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
                rows.iter().map(|&i| (features[i].clone(), labels[i])).unzip()
            };
            let (train_x, train_y) = take(&train);
            let (test_x, test_y) = take(&held_out);

            let model = spec.fit(&train_x, &train_y, feature_names)?;
            let predictions = model.predict_batch(&test_x)?;
            let score = scoring.score(&test_y, &predictions)?;
            debug!(fold, score, "fold scored");
            fold_scores.push(score);
        }
        Ok(CvScore::from_folds(fold_scores))
    }
}
