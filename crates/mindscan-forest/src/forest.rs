//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::ForestError;
use crate::result::{RandomForestResult, TrainingSummary};
use crate::tree::{DecisionTree, check_training_data, n_classes_of, to_columns};

/// A fitted random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Draw `n` row indices with replacement.
fn bootstrap_rows(n: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

#[instrument(skip_all, fields(n_estimators = config.n_estimators, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, ForestError> {
    let n_features = check_training_data(features, labels)?;
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureNameMismatch {
            n_features,
            n_names: feature_names.len(),
        });
    }
    let max_features = config.max_features.resolve(n_features)?;
    let template = config.tree_template(max_features);
    template.validate()?;

    let n_samples = features.len();
    let n_classes = n_classes_of(labels);
    let columns = to_columns(features, n_features);

    info!(
        n_estimators = config.n_estimators,
        n_samples,
        n_features,
        n_classes,
        max_features,
        "training random forest"
    );

    // Seeds are drawn up front so the result does not depend on thread scheduling.
    let mut master = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_estimators).map(|_| master.r#gen()).collect();

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rows = bootstrap_rows(n_samples, &mut rng);
            template
                .clone()
                .with_seed(rng.r#gen())
                .grow(&columns, labels, &rows, n_classes)
        })
        .collect::<Result<_, _>>()?;

    debug!(n_trees = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };
    let importances = forest.feature_importances();
    let summary = TrainingSummary {
        n_estimators: config.n_estimators,
        n_features,
        n_classes,
        n_samples,
        max_features,
    };

    info!("random forest training complete");
    Ok(RandomForestResult::new(forest, importances, summary))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::error::ForestError;

    /// Two informative bands on `x`, constant `y`.
    fn banded() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..25 {
            features.push(vec![i as f64 * 0.2, 1.0]);
            labels.push(0);
            features.push(vec![20.0 + i as f64 * 0.2, 1.0]);
            labels.push(1);
        }
        (features, labels, vec!["x".to_string(), "y".to_string()])
    }

    #[test]
    fn separable_bands_are_learned() {
        let (features, labels, names) = banded();
        let result = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        assert_eq!(predictions, labels);
        assert_eq!(result.forest().n_trees(), 25);
        assert_eq!(result.summary().max_features, 2);
    }

    #[test]
    fn importances_rank_the_informative_feature_first() {
        let (features, labels, names) = banded();
        let result = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let ranked = result.importances();
        assert_eq!(ranked[0].name, "x");
        assert_eq!(ranked[0].rank, 1);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels, names) = banded();
        let fit = |seed| {
            RandomForestConfig::new(8)
                .unwrap()
                .with_seed(seed)
                .fit(&features, &labels, &names)
                .unwrap()
        };
        let a = fit(3);
        let b = fit(3);
        let pa = a.forest().predict_proba_batch(&features).unwrap();
        let pb = b.forest().predict_proba_batch(&features).unwrap();
        for (x, y) in pa.iter().zip(&pb) {
            assert_eq!(x.as_slice(), y.as_slice());
        }
    }

    #[test]
    fn feature_names_must_match_columns() {
        let (features, labels, _) = banded();
        let err = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureNameMismatch { n_features: 2, n_names: 1 }
        ));
    }

    #[test]
    fn empty_dataset_rejected() {
        let err = RandomForestConfig::new(2).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }
}
