//! Confusion matrix and per-class classification metrics.

use std::fmt;

use serde::Serialize;

use crate::error::ForestError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero labels provided |
    /// | [`ForestError::LabelCountMismatch`] | The two vectors differ in length |
    /// | [`ForestError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if true_labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= n_classes) {
                return Err(ForestError::LabelOutOfRange {
                    label,
                    index,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Like [`ConfusionMatrix::from_labels`], sizing the matrix from the
    /// largest label seen (at least two classes).
    ///
    /// # Errors
    ///
    /// As for [`ConfusionMatrix::from_labels`].
    pub fn infer(true_labels: &[usize], predicted: &[usize]) -> Result<Self, ForestError> {
        let n_classes = true_labels
            .iter()
            .chain(predicted)
            .max()
            .map_or(2, |&m| (m + 1).max(2));
        Self::from_labels(true_labels, predicted, n_classes)
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = self.matrix.iter().map(|row| row[c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Support-weighted mean of the per-class F1 scores.
    #[must_use]
    pub fn weighted_f1(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.class_metrics()
            .iter()
            .map(|m| m.f1 * m.support as f64)
            .sum::<f64>()
            / total as f64
    }

    /// Count at `[true_class][predicted_class]`.
    #[must_use]
    pub fn get(&self, true_class: usize, predicted_class: usize) -> usize {
        self.matrix[true_class][predicted_class]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Render with human-readable class names; missing names fall back to
    /// the class index.
    #[must_use]
    pub fn render(&self, class_names: &[&str]) -> String {
        let names: Vec<String> = (0..self.n_classes)
            .map(|c| class_names.get(c).map_or_else(|| c.to_string(), |n| (*n).to_string()))
            .collect();
        let width = names
            .iter()
            .map(String::len)
            .chain(self.matrix.iter().flatten().map(|v| v.to_string().len()))
            .max()
            .unwrap_or(1)
            .max("true \\ pred".len());

        let mut out = format!("{:>width$}", "true \\ pred");
        for name in &names {
            out.push_str(&format!(" {name:>width$}"));
        }
        out.push('\n');
        for (name, row) in names.iter().zip(&self.matrix) {
            out.push_str(&format!("{name:>width$}"));
            for val in row {
                out.push_str(&format!(" {val:>width$}"));
            }
            out.push('\n');
        }
        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, 3).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
        assert!((cm.weighted_f1() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn binary_counts_land_in_the_right_cells() {
        // tn=1 fp=1 fn=1 tp=2
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1, 1], &[0, 1, 0, 1, 1], 2).unwrap();
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 0), 1);
        assert_eq!(cm.get(1, 1), 2);
        assert_eq!(cm.total(), 5);
        let m = cm.class_metrics();
        assert!((m[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m[0].support, 2);
    }

    #[test]
    fn weighted_f1_uses_support() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 1], &[0, 0, 0, 0], 2).unwrap();
        // class 0: p=0.75 r=1 f1=6/7; class 1: f1=0
        assert!((cm.weighted_f1() - 0.75 * 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn bad_inputs_rejected() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 2),
            Err(ForestError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2),
            Err(ForestError::LabelCountMismatch { n_rows: 2, n_labels: 1 })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0, 2], 2),
            Err(ForestError::LabelOutOfRange { label: 2, index: 1, n_classes: 2 })
        ));
    }

    #[test]
    fn infer_sizes_to_at_least_two() {
        let cm = ConfusionMatrix::infer(&[0, 0], &[0, 0]).unwrap();
        assert_eq!(cm.n_classes(), 2);
    }

    #[test]
    fn render_uses_class_names() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let text = cm.render(&["Not Depressed", "Depressed"]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Not Depressed"));
        assert!(lines[2].trim_start().starts_with("Depressed"));
    }

    #[test]
    fn display_falls_back_to_class_indices() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 1], &[0, 1, 0], 2).unwrap();
        let text = cm.to_string();
        assert_eq!(text, cm.render(&[]));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("true \\ pred"));
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), ["1", "1", "1"]);
    }
}
