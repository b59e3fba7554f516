//! Scoring functions over true/predicted label vectors.
//!
//! Binary scores treat class `1` as positive. A zero denominator yields 0.0.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;

const POSITIVE: usize = 1;

fn check(y_true: &[usize], y_pred: &[usize]) -> Result<(), ForestError> {
    if y_true.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    if y_true.len() != y_pred.len() {
        return Err(ForestError::LabelCountMismatch {
            n_rows: y_true.len(),
            n_labels: y_pred.len(),
        });
    }
    Ok(())
}

/// Positive-class counts: (true positives, predicted positives, actual positives).
fn positive_counts(y_true: &[usize], y_pred: &[usize]) -> (usize, usize, usize) {
    y_true
        .iter()
        .zip(y_pred)
        .fold((0, 0, 0), |(tp, pp, ap), (&t, &p)| {
            (
                tp + usize::from(t == POSITIVE && p == POSITIVE),
                pp + usize::from(p == POSITIVE),
                ap + usize::from(t == POSITIVE),
            )
        })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Fraction of positions where the labels agree.
///
/// # Errors
///
/// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
    check(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// TP / predicted positives.
///
/// # Errors
///
/// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
pub fn precision_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
    check(y_true, y_pred)?;
    let (tp, predicted, _) = positive_counts(y_true, y_pred);
    Ok(ratio(tp, predicted))
}

/// TP / actual positives.
///
/// # Errors
///
/// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
pub fn recall_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
    check(y_true, y_pred)?;
    let (tp, _, actual) = positive_counts(y_true, y_pred);
    Ok(ratio(tp, actual))
}

/// Harmonic mean of precision and recall for the positive class.
///
/// # Errors
///
/// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
pub fn f1_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
    check(y_true, y_pred)?;
    let (tp, predicted, actual) = positive_counts(y_true, y_pred);
    // 2TP / (2TP + FP + FN)
    Ok(ratio(2 * tp, predicted + actual))
}

/// Per-class F1 averaged with weights equal to class support.
///
/// # Errors
///
/// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
pub fn weighted_f1_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
    check(y_true, y_pred)?;
    Ok(ConfusionMatrix::infer(y_true, y_pred)?.weighted_f1())
}

/// Metric used to rank hyperparameter candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    F1,
    Precision,
    WeightedF1,
}

impl Scoring {
    /// Score a prediction vector.
    ///
    /// # Errors
    ///
    /// [`ForestError::EmptyDataset`] or [`ForestError::LabelCountMismatch`].
    pub fn score(self, y_true: &[usize], y_pred: &[usize]) -> Result<f64, ForestError> {
        match self {
            Scoring::Accuracy => accuracy_score(y_true, y_pred),
            Scoring::F1 => f1_score(y_true, y_pred),
            Scoring::Precision => precision_score(y_true, y_pred),
            Scoring::WeightedF1 => weighted_f1_score(y_true, y_pred),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::F1 => "f1",
            Scoring::Precision => "precision",
            Scoring::WeightedF1 => "f1_weighted",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scoring {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Scoring::Accuracy),
            "f1" => Ok(Scoring::F1),
            "precision" => Ok(Scoring::Precision),
            "f1_weighted" | "weighted_f1" => Ok(Scoring::WeightedF1),
            other => Err(format!(
                "unknown scoring '{other}', expected accuracy, f1, precision or f1_weighted"
            )),
        }
    }
}
