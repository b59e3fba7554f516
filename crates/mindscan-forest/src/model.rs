//! Model abstraction shared by the two learners.
//!
//! [`ModelSpec`] is an untrained template, [`TrainedModel`] a fitted one, and
//! [`Classifier`] wraps both to give a fit-then-predict lifecycle.

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::importance::{FeatureImportance, rank_importances};
use crate::params::{ParamSet, ParamValue};
use crate::split::SplitCriterion;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// An untrained model template.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    DecisionTree(DecisionTreeConfig),
    RandomForest(RandomForestConfig),
}

fn invalid(name: &str, value: &ParamValue) -> ForestError {
    ForestError::InvalidParameterValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn int(name: &str, value: &ParamValue) -> Result<usize, ForestError> {
    match value {
        ParamValue::Int(v) => Ok(*v),
        other => Err(invalid(name, other)),
    }
}

fn optional_int(name: &str, value: &ParamValue) -> Result<Option<usize>, ForestError> {
    match value {
        ParamValue::Int(v) => Ok(Some(*v)),
        ParamValue::Absent => Ok(None),
        other @ ParamValue::Text(_) => Err(invalid(name, other)),
    }
}

fn criterion(name: &str, value: &ParamValue) -> Result<SplitCriterion, ForestError> {
    match value {
        ParamValue::Text(s) => s.parse().map_err(|_| invalid(name, value)),
        other => Err(invalid(name, other)),
    }
}

impl ModelSpec {
    /// Short name used in logs and error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::DecisionTree(_) => "decision_tree",
            ModelSpec::RandomForest(_) => "random_forest",
        }
    }

    /// Override a single hyperparameter by name.
    ///
    /// Both kinds accept `criterion`, `max_depth`, `min_samples_leaf`,
    /// `min_samples_split` and `max_features`; the forest also accepts
    /// `n_estimators`. Range checks beyond the value's kind happen at fit time,
    /// except `n_estimators = 0` which is rejected here.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::UnknownParameter`] | `name` is not accepted by this kind |
    /// | [`ForestError::InvalidParameterValue`] | `value` has the wrong kind |
    /// | [`ForestError::InvalidTreeCount`] | `n_estimators = 0` |
    pub fn with_param(self, name: &str, value: &ParamValue) -> Result<Self, ForestError> {
        let kind = self.kind();
        match self {
            ModelSpec::DecisionTree(config) => {
                let config = match name {
                    "criterion" => config.with_criterion(criterion(name, value)?),
                    "max_depth" => config.with_max_depth(optional_int(name, value)?),
                    "min_samples_leaf" => config.with_min_samples_leaf(int(name, value)?),
                    "min_samples_split" => config.with_min_samples_split(int(name, value)?),
                    "max_features" => config.with_max_features(optional_int(name, value)?),
                    _ => {
                        return Err(ForestError::UnknownParameter {
                            name: name.to_string(),
                            model: kind,
                        });
                    }
                };
                Ok(ModelSpec::DecisionTree(config))
            }
            ModelSpec::RandomForest(config) => {
                let config = match name {
                    "criterion" => config.with_criterion(criterion(name, value)?),
                    "max_depth" => config.with_max_depth(optional_int(name, value)?),
                    "min_samples_leaf" => config.with_min_samples_leaf(int(name, value)?),
                    "min_samples_split" => config.with_min_samples_split(int(name, value)?),
                    "n_estimators" => config.with_n_estimators(int(name, value)?)?,
                    "max_features" => config.with_max_features(match value {
                        ParamValue::Int(k) => MaxFeatures::Fixed(*k),
                        ParamValue::Absent => MaxFeatures::All,
                        ParamValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                            "sqrt" => MaxFeatures::Sqrt,
                            "log2" => MaxFeatures::Log2,
                            _ => return Err(invalid(name, value)),
                        },
                    }),
                    _ => {
                        return Err(ForestError::UnknownParameter {
                            name: name.to_string(),
                            model: kind,
                        });
                    }
                };
                Ok(ModelSpec::RandomForest(config))
            }
        }
    }

    /// Apply every entry of `params` in key order.
    ///
    /// # Errors
    ///
    /// As for [`ModelSpec::with_param`].
    pub fn with_params(self, params: &ParamSet) -> Result<Self, ForestError> {
        params
            .iter()
            .try_fold(self, |spec, (name, value)| spec.with_param(name, value))
    }

    /// Train on a row-major dataset.
    ///
    /// `feature_names` needs one entry per column for the forest; the tree
    /// ignores it.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit`] and [`RandomForestConfig::fit`].
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<TrainedModel, ForestError> {
        match self {
            ModelSpec::DecisionTree(config) => Ok(TrainedModel::Tree(config.fit(features, labels)?)),
            ModelSpec::RandomForest(config) => Ok(TrainedModel::Forest(
                config.fit(features, labels, feature_names)?.into_forest(),
            )),
        }
    }
}

/// A fitted model.
#[derive(Debug, Clone)]
pub enum TrainedModel {
    Tree(DecisionTree),
    Forest(RandomForest),
}

impl TrainedModel {
    /// Predict one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        match self {
            TrainedModel::Tree(tree) => tree.predict(sample),
            TrainedModel::Forest(forest) => forest.predict(sample),
        }
    }

    /// One label per row, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        match self {
            TrainedModel::Tree(tree) => tree.predict_batch(features),
            TrainedModel::Forest(forest) => forest.predict_batch(features),
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::Tree(tree) => tree.n_features(),
            TrainedModel::Forest(forest) => forest.n_features(),
        }
    }

    /// Ranked importance table; `names` labels the columns.
    #[must_use]
    pub fn feature_importances(&self, names: &[String]) -> Vec<FeatureImportance> {
        match self {
            TrainedModel::Tree(tree) => rank_importances(&[tree.feature_importances()], names),
            TrainedModel::Forest(forest) => forest.feature_importances(),
        }
    }

    #[must_use]
    pub fn as_tree(&self) -> Option<&DecisionTree> {
        match self {
            TrainedModel::Tree(tree) => Some(tree),
            TrainedModel::Forest(_) => None,
        }
    }

    #[must_use]
    pub fn as_forest(&self) -> Option<&RandomForest> {
        match self {
            TrainedModel::Forest(forest) => Some(forest),
            TrainedModel::Tree(_) => None,
        }
    }
}

/// A model template plus, once fitted, its trained form.
#[derive(Debug, Clone)]
pub struct Classifier {
    spec: ModelSpec,
    model: Option<TrainedModel>,
}

impl Classifier {
    #[must_use]
    pub fn new(spec: ModelSpec) -> Self {
        Self { spec, model: None }
    }

    /// Fit (or refit) on `features`/`labels`.
    ///
    /// # Errors
    ///
    /// See [`ModelSpec::fit`]. A failed fit leaves any previous model in place.
    pub fn fit(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<&TrainedModel, ForestError> {
        let model = self.spec.fit(features, labels, feature_names)?;
        Ok(self.model.insert(model))
    }

    /// # Errors
    ///
    /// [`ForestError::NotFitted`] before the first successful fit, otherwise
    /// as for [`TrainedModel::predict_batch`].
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        self.model
            .as_ref()
            .ok_or(ForestError::NotFitted)?
            .predict_batch(features)
    }

    #[must_use]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    #[must_use]
    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 2) as f64]).collect();
        let labels = (0..30).map(|i| usize::from(i >= 15)).collect();
        (features, labels, vec!["a".to_string(), "b".to_string()])
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let clf = Classifier::new(ModelSpec::DecisionTree(DecisionTreeConfig::new()));
        assert!(matches!(clf.predict(&[vec![0.0, 0.0]]), Err(ForestError::NotFitted)));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn fit_then_predict_one_label_per_row() {
        let (features, labels, names) = data();
        for spec in [
            ModelSpec::DecisionTree(DecisionTreeConfig::new()),
            ModelSpec::RandomForest(RandomForestConfig::new(5).unwrap()),
        ] {
            let mut clf = Classifier::new(spec);
            clf.fit(&features, &labels, &names).unwrap();
            let predictions = clf.predict(&features).unwrap();
            assert_eq!(predictions.len(), features.len());
        }
    }

    #[test]
    fn mismatched_rows_rejected() {
        let (features, _, names) = data();
        let spec = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        assert!(matches!(
            spec.fit(&features, &[0, 1], &names),
            Err(ForestError::LabelCountMismatch { .. })
        ));
    }

    #[test]
    fn params_apply_to_the_tree() {
        let params: ParamSet = [
            ("criterion", ParamValue::from("entropy")),
            ("max_depth", ParamValue::Absent),
            ("min_samples_leaf", ParamValue::Int(5)),
        ]
        .into_iter()
        .collect();
        let spec = ModelSpec::DecisionTree(DecisionTreeConfig::new().with_max_depth(Some(3)))
            .with_params(&params)
            .unwrap();
        let ModelSpec::DecisionTree(config) = spec else {
            panic!("kind changed");
        };
        assert_eq!(config.criterion(), SplitCriterion::Entropy);
        assert_eq!(config.max_depth(), None);
        assert_eq!(config.min_samples_leaf(), 5);
    }

    #[test]
    fn forest_only_params_rejected_for_tree() {
        let spec = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        assert!(matches!(
            spec.with_param("n_estimators", &ParamValue::Int(10)),
            Err(ForestError::UnknownParameter { model: "decision_tree", .. })
        ));
    }

    #[test]
    fn forest_max_features_values() {
        let spec = ModelSpec::RandomForest(RandomForestConfig::new(10).unwrap());
        let spec = spec.with_param("max_features", &ParamValue::from("log2")).unwrap();
        let ModelSpec::RandomForest(config) = &spec else {
            panic!("kind changed");
        };
        assert_eq!(config.max_features(), MaxFeatures::Log2);
        assert!(matches!(
            spec.clone().with_param("max_features", &ParamValue::from("half")),
            Err(ForestError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            spec.with_param("criterion", &ParamValue::Int(1)),
            Err(ForestError::InvalidParameterValue { .. })
        ));
    }
}
