//! Randomized hyperparameter search with k-fold cross-validation.

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cv::CrossValidation;
use crate::error::ForestError;
use crate::metrics::Scoring;
use crate::model::{ModelSpec, TrainedModel};
use crate::params::{ParamGrid, ParamSet};

/// Randomized search configuration.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | folds     | 5       |
/// | scoring   | `Accuracy` |
/// | seed      | 42      |
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    n_iter: usize,
    cv: CrossValidation,
    scoring: Scoring,
    seed: u64,
}

/// Cross-validated score of one sampled combination.
#[derive(Debug, Clone, Serialize)]
pub struct Trial {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Outcome of a search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_params: ParamSet,
    /// Mean CV score of `best_params`.
    pub best_score: f64,
    /// Template with `best_params` applied.
    pub best_spec: ModelSpec,
    /// `best_spec` refitted on the full training set.
    pub best_model: TrainedModel,
    /// Every trial, in draw order.
    pub trials: Vec<Trial>,
    /// Size of the full Cartesian product.
    pub grid_size: usize,
}

impl RandomizedSearch {
    /// Sample up to `n_iter` combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidSampleBudget`] if `n_iter` is zero.
    pub fn new(n_iter: usize) -> Result<Self, ForestError> {
        if n_iter == 0 {
            return Err(ForestError::InvalidSampleBudget { n_iter });
        }
        Ok(Self {
            n_iter,
            cv: CrossValidation::new(5)?,
            scoring: Scoring::Accuracy,
            seed: 42,
        })
    }

    #[must_use]
    pub fn with_cv(mut self, cv: CrossValidation) -> Self {
        self.cv = cv;
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Seed for candidate sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    #[must_use]
    pub fn cv(&self) -> &CrossValidation {
        &self.cv
    }

    #[must_use]
    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Draw `min(n_iter, grid size)` distinct combinations in seeded order.
    ///
    /// # Errors
    ///
    /// [`ForestError::InvalidGrid`] for an empty or overflowing grid.
    pub fn candidates(&self, grid: &ParamGrid) -> Result<Vec<ParamSet>, ForestError> {
        let size = grid.n_combinations()?;
        let amount = self.n_iter.min(size);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        index::sample(&mut rng, size, amount)
            .into_iter()
            .map(|i| {
                grid.combination(i).ok_or_else(|| ForestError::InvalidGrid {
                    reason: format!("combination {i} out of range"),
                })
            })
            .collect()
    }

    /// Run the search and refit the winner on all of `features`.
    ///
    /// Trials run in parallel but are collected in draw order; the highest
    /// mean score wins and ties go to the earlier draw.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidGrid`] | Empty grid or a parameter with no values |
    /// | [`ForestError::UnknownParameter`] | A key the template's kind does not accept |
    /// | [`ForestError::InvalidParameterValue`] | A value of the wrong kind |
    /// | [`ForestError::TooFewSamplesForFolds`] | A class is smaller than the fold count |
    /// | Other errors | From any trial's training or scoring |
    #[instrument(skip_all, fields(model = template.kind(), n_samples = features.len()))]
    pub fn fit(
        &self,
        template: &ModelSpec,
        grid: &ParamGrid,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<SearchResult, ForestError> {
        let grid_size = grid.n_combinations()?;
        for (name, values) in grid.iter() {
            for value in values {
                template.clone().with_param(name, value)?;
            }
        }
        if features.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }

        let candidates = self.candidates(grid)?;
        let folds = self.cv.folds(labels)?;
        info!(
            grid_size,
            n_candidates = candidates.len(),
            n_folds = folds.n_folds(),
            total_fits = candidates.len() * folds.n_folds(),
            scoring = %self.scoring,
            "starting randomized search"
        );

        let trials: Vec<Trial> = candidates
            .into_par_iter()
            .map(|params| {
                let spec = template.clone().with_params(&params)?;
                let score = folds.score(&spec, features, labels, feature_names, self.scoring)?;
                debug!(params = %params, mean = score.mean, "candidate scored");
                Ok(Trial {
                    params,
                    fold_scores: score.fold_scores,
                    mean_score: score.mean,
                    std_score: score.std,
                })
            })
            .collect::<Result<_, ForestError>>()?;

        let mut best = 0;
        for (i, trial) in trials.iter().enumerate() {
            if trial.mean_score > trials[best].mean_score {
                best = i;
            }
        }
        let best_trial = &trials[best];
        let best_spec = template.clone().with_params(&best_trial.params)?;
        let best_model = best_spec.fit(features, labels, feature_names)?;

        info!(
            best_score = best_trial.mean_score,
            best_params = %best_trial.params,
            "randomized search complete"
        );

        Ok(SearchResult {
            best_params: best_trial.params.clone(),
            best_score: best_trial.mean_score,
            best_spec,
            best_model,
            trials,
            grid_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::tree::DecisionTreeConfig;

    fn grid() -> ParamGrid {
        ParamGrid::new()
            .with("max_depth", [Some(1usize), Some(2), Some(4), None])
            .with("min_samples_leaf", [1usize, 2, 5])
            .with("criterion", ["gini", "entropy"])
    }

    fn data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 20) as f64, (i / 20) as f64, ((i * 7) % 11) as f64])
            .collect();
        let labels = features
            .iter()
            .map(|r| usize::from(r[0] >= 10.0 && r[1] > 0.0))
            .collect();
        let names = ["a", "b", "c"].map(String::from).to_vec();
        (features, labels, names)
    }

    #[test]
    fn zero_budget_rejected() {
        assert!(matches!(
            RandomizedSearch::new(0),
            Err(ForestError::InvalidSampleBudget { n_iter: 0 })
        ));
    }

    #[test]
    fn candidates_are_distinct_and_capped() {
        let search = RandomizedSearch::new(100).unwrap();
        let drawn = search.candidates(&grid()).unwrap();
        assert_eq!(drawn.len(), 24);
        let mut names: Vec<String> = drawn.iter().map(ToString::to_string).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 24);

        let few = RandomizedSearch::new(5).unwrap().candidates(&grid()).unwrap();
        assert_eq!(few.len(), 5);
        let again = RandomizedSearch::new(5).unwrap().candidates(&grid()).unwrap();
        assert_eq!(few, again);
    }

    #[test]
    fn search_records_every_trial_and_refits() {
        let (features, labels, names) = data();
        let search = RandomizedSearch::new(6)
            .unwrap()
            .with_cv(CrossValidation::new(3).unwrap());
        let template = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        let result = search.fit(&template, &grid(), &features, &labels, &names).unwrap();
        assert_eq!(result.trials.len(), 6);
        assert_eq!(result.grid_size, 24);
        let max = result.trials.iter().map(|t| t.mean_score).fold(f64::MIN, f64::max);
        assert_eq!(result.best_score, max);
        assert_eq!(result.best_model.predict_batch(&features).unwrap().len(), 60);
    }

    #[test]
    fn unknown_grid_key_rejected_before_training() {
        let (features, labels, names) = data();
        let grid = ParamGrid::new().with("n_estimators", [10usize]);
        let template = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        let err = RandomizedSearch::new(3)
            .unwrap()
            .fit(&template, &grid, &features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::UnknownParameter { .. }));

        let grid = ParamGrid::new().with("max_depth", [ParamValue::from("deep")]);
        let err = RandomizedSearch::new(3)
            .unwrap()
            .fit(&template, &grid, &features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidParameterValue { .. }));
    }

    #[test]
    fn equal_scores_keep_the_first_drawn_candidate() {
        // Two well-separated bands: every candidate scores 1.0 on every fold.
        let features: Vec<Vec<f64>> = (0..15)
            .flat_map(|i| [vec![i as f64], vec![100.0 + i as f64]])
            .collect();
        let labels: Vec<usize> = (0..30).map(|i| i % 2).collect();
        let names = vec!["x".to_string()];
        let grid = ParamGrid::new()
            .with("criterion", ["gini", "entropy"])
            .with("min_samples_leaf", [1usize, 2]);
        let template = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        let result = RandomizedSearch::new(4)
            .unwrap()
            .with_cv(CrossValidation::new(3).unwrap())
            .fit(&template, &grid, &features, &labels, &names)
            .unwrap();
        assert!(result.trials.iter().all(|t| t.mean_score == 1.0));
        assert_eq!(result.best_params, result.trials[0].params);
        assert_ne!(result.best_params, result.trials[3].params);
    }
}
