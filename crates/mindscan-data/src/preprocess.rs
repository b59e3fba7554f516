//! Column exclusion, one-hot encoding, missing-row handling, and
//! feature/target separation.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{Column, Dataset, Table};

/// What preprocessing did to the table, for console and report output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreprocessReport {
    /// Columns left after exclusion, target included, before encoding.
    pub retained: Vec<String>,
    /// Columns removed by name.
    pub dropped: Vec<String>,
    /// Categorical columns replaced by indicators.
    pub encoded: Vec<String>,
    /// Rows removed for missing values.
    pub rows_dropped: usize,
    /// Rows in the resulting dataset.
    pub n_rows: usize,
}

/// Turns a [`Table`] into a numeric [`Dataset`].
///
/// Steps, in order: drop excluded columns, one-hot encode categorical
/// features, optionally drop rows with missing values, split off the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    target: String,
    excluded: Vec<String>,
    drop_missing: bool,
}

impl Preprocessor {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            excluded: Vec::new(),
            drop_missing: false,
        }
    }

    /// Columns removed before encoding.
    #[must_use]
    pub fn with_excluded<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.excluded = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Drop rows with a missing feature or target instead of failing.
    #[must_use]
    pub fn with_drop_missing(mut self, drop_missing: bool) -> Self {
        self.drop_missing = drop_missing;
        self
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run every step and return the dataset with its report.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::UnknownColumn`] | An excluded column or the target is absent |
    /// | [`DataError::InvalidTarget`] | Target is excluded, categorical, negative or fractional |
    /// | [`DataError::MissingValue`] | A numeric/boolean cell is missing and rows are kept |
    /// | [`DataError::EmptyDataset`] | Every row was dropped |
    #[instrument(skip_all, fields(target = %self.target, drop_missing = self.drop_missing))]
    pub fn run(&self, table: &Table) -> Result<(Dataset, PreprocessReport), DataError> {
        if self.excluded.contains(&self.target) {
            return Err(DataError::InvalidTarget {
                column: self.target.clone(),
                reason: "target is in the excluded column list".to_string(),
            });
        }
        let trimmed = table.drop_columns(&self.excluded)?;
        if trimmed.position(&self.target).is_none() {
            return Err(DataError::UnknownColumn {
                name: self.target.clone(),
            });
        }
        let retained = trimmed.column_names().to_vec();
        debug!(n_dropped = self.excluded.len(), n_retained = retained.len(), "columns excluded");

        let (encoded_table, encoded) = trimmed.one_hot(std::slice::from_ref(&self.target))?;
        debug!(n_encoded = encoded.len(), width = encoded_table.n_columns(), "one-hot encoded");

        let (clean, rows_dropped) = if self.drop_missing {
            encoded_table.drop_missing()
        } else {
            (encoded_table, 0)
        };
        if clean.n_rows() == 0 {
            return Err(DataError::EmptyDataset {
                source_name: "preprocessing (all rows had missing values)".to_string(),
            });
        }

        let labels = target_labels(&self.target, clean.column(&self.target))?;
        let feature_columns: Vec<(&str, &Column)> =
            clean.iter().filter(|(name, _)| *name != self.target).collect();
        let feature_names: Vec<String> = feature_columns.iter().map(|(n, _)| n.to_string()).collect();

        let mut features = vec![Vec::with_capacity(feature_columns.len()); clean.n_rows()];
        for (name, column) in &feature_columns {
            for (row, out) in features.iter_mut().enumerate() {
                out.push(numeric_cell(name, column, row)?);
            }
        }

        let n_rows = labels.len();
        let dataset = Dataset::new(feature_names, features, labels)?;
        info!(
            n_rows,
            n_features = dataset.n_features(),
            rows_dropped,
            n_encoded = encoded.len(),
            "preprocessing complete"
        );

        Ok((
            dataset,
            PreprocessReport {
                retained,
                dropped: self.excluded.clone(),
                encoded,
                rows_dropped,
                n_rows,
            },
        ))
    }
}

fn numeric_cell(name: &str, column: &Column, row: usize) -> Result<f64, DataError> {
    let missing = || DataError::MissingValue {
        column: name.to_string(),
        row,
    };
    match column {
        Column::Numeric(v) => v[row].ok_or_else(missing),
        Column::Boolean(v) => v[row].map(f64::from).ok_or_else(missing),
        // one_hot has already replaced every categorical feature
        Column::Categorical(_) => Err(missing()),
    }
}

fn target_labels(name: &str, column: Option<&Column>) -> Result<Vec<usize>, DataError> {
    let invalid = |reason: String| DataError::InvalidTarget {
        column: name.to_string(),
        reason,
    };
    let missing = |row| DataError::MissingValue {
        column: name.to_string(),
        row,
    };
    match column {
        None => Err(DataError::UnknownColumn {
            name: name.to_string(),
        }),
        Some(Column::Numeric(values)) => values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                let v = v.ok_or_else(|| missing(row))?;
                if v < 0.0 || v.fract() != 0.0 {
                    return Err(invalid(format!("value {v} at row {row} is not a class index")));
                }
                Ok(v as usize)
            })
            .collect(),
        Some(Column::Boolean(values)) => values
            .iter()
            .enumerate()
            .map(|(row, v)| v.map(usize::from).ok_or_else(|| missing(row)))
            .collect(),
        Some(Column::Categorical(_)) => Err(invalid("column is categorical".to_string())),
    }
}
