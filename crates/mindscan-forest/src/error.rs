/// Errors from tree/forest training, prediction, scoring, and search.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidTreeCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the fold count is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when a class has fewer samples than the number of folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The class label with insufficient samples.
        class: usize,
        /// The number of samples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a dataset or label vector has zero rows.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the feature matrix and label vector disagree on row count.
    #[error("feature matrix has {n_rows} rows but {n_labels} labels were given")]
    LabelCountMismatch {
        /// Rows in the feature matrix (or first label vector).
        n_rows: usize,
        /// Entries in the label vector.
        n_labels: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature-name list does not match the column count.
    #[error("{n_names} feature names given for {n_features} columns")]
    FeatureNameMismatch {
        /// Columns in the feature matrix.
        n_features: usize,
        /// Names supplied.
        n_names: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is not below the declared class count.
    #[error("label {label} at index {index} is outside 0..{n_classes}")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Position of the label in its vector.
        index: usize,
        /// Number of classes the matrix was sized for.
        n_classes: usize,
    },

    /// Returned when predict is called on a classifier that was never fitted.
    #[error("classifier is not fitted; call fit before predict")]
    NotFitted,

    /// Returned when a parameter grid is structurally unusable.
    #[error("invalid parameter grid: {reason}")]
    InvalidGrid {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when a grid names a parameter the model kind does not accept.
    #[error("unknown parameter \"{name}\" for {model}")]
    UnknownParameter {
        /// The offending parameter name.
        name: String,
        /// The model kind the parameter was applied to.
        model: &'static str,
    },

    /// Returned when a parameter value has the wrong kind or range.
    #[error("invalid value {value} for parameter \"{name}\"")]
    InvalidParameterValue {
        /// The parameter name.
        name: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Returned when the search is asked to sample zero candidates.
    #[error("sample budget must be at least 1, got {n_iter}")]
    InvalidSampleBudget {
        /// The invalid budget.
        n_iter: usize,
    },
}
