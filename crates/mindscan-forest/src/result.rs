//! Training result types for the random forest.

use crate::forest::RandomForest;
use crate::importance::FeatureImportance;

/// Shape of a training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub n_estimators: usize,
    pub n_features: usize,
    pub n_classes: usize,
    pub n_samples: usize,
    /// `max_features` after resolving `Sqrt`/`Log2` against the data.
    pub max_features: usize,
}

/// A fitted forest together with its ranked importances.
#[derive(Debug, Clone)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<FeatureImportance>,
    summary: TrainingSummary,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<FeatureImportance>,
        summary: TrainingSummary,
    ) -> Self {
        Self {
            forest,
            importances,
            summary,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Importance table, most important first.
    #[must_use]
    pub fn importances(&self) -> &[FeatureImportance] {
        &self.importances
    }

    #[must_use]
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }
}
