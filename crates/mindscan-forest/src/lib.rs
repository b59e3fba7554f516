//! Decision tree and random forest classification: train, cross-validate,
//! search, evaluate.
//!
//! Provides hand-rolled CART decision trees with Gini/Entropy split criteria,
//! a bagged random forest trained in parallel via rayon, impurity-based
//! feature importance, classification metrics, stratified k-fold
//! cross-validation, and randomized hyperparameter search over a discrete grid.

mod config;
mod confusion;
mod cv;
mod error;
mod export;
mod forest;
mod importance;
pub mod metrics;
mod model;
mod node;
mod params;
mod predict;
mod result;
mod search;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use cv::{CrossValidation, CvScore, Folds};
pub use error::ForestError;
pub use export::DEFAULT_EXPORT_DEPTH;
pub use forest::RandomForest;
pub use importance::FeatureImportance;
pub use metrics::Scoring;
pub use model::{Classifier, ModelSpec, TrainedModel};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingSummary};
pub use search::{RandomizedSearch, SearchResult, Trial};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
