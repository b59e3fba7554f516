//! Domain types for mindscan-data.

use std::collections::HashMap;
use std::fmt;

use crate::DataError;

/// One typed column of a [`Table`]. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Categorical(Vec<Option<String>>),
}

/// Borrowed view of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Number(f64),
    Flag(bool),
    Text(&'a str),
    Missing,
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Flag(b) => write!(f, "{b}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => f.write_str("NA"),
        }
    }
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `"numeric"`, `"boolean"` or `"categorical"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Boolean(_) => "boolean",
            Column::Categorical(_) => "categorical",
        }
    }

    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Column::Categorical(_))
    }

    /// Cell at `row`; out-of-range rows read as missing.
    #[must_use]
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match self {
            Column::Numeric(v) => v.get(row).copied().flatten().map_or(Cell::Missing, Cell::Number),
            Column::Boolean(v) => v.get(row).copied().flatten().map_or(Cell::Missing, Cell::Flag),
            Column::Categorical(v) => v
                .get(row)
                .and_then(Option::as_deref)
                .map_or(Cell::Missing, Cell::Text),
        }
    }

    #[must_use]
    pub fn is_missing(&self, row: usize) -> bool {
        matches!(self.cell(row), Cell::Missing)
    }

    #[must_use]
    pub fn n_missing(&self) -> usize {
        (0..self.len()).filter(|&r| self.is_missing(r)).count()
    }

    /// Keep the rows whose `keep` flag is set.
    fn filter_rows(&self, keep: &[bool]) -> Column {
        fn pick<T: Clone>(values: &[Option<T>], keep: &[bool]) -> Vec<Option<T>> {
            values
                .iter()
                .zip(keep)
                .filter(|&(_, &k)| k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            Column::Numeric(v) => Column::Numeric(pick(v, keep)),
            Column::Boolean(v) => Column::Boolean(pick(v, keep)),
            Column::Categorical(v) => Column::Categorical(pick(v, keep)),
        }
    }
}

/// Ordered, named, typed columns of equal length.
///
/// Transformations return a new table; the original is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from parallel name and column vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::DuplicateColumn`] | Two columns share a name |
    /// | [`DataError::ShapeMismatch`] | Name/column counts differ, or columns differ in length |
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> Result<Self, DataError> {
        if names.len() != columns.len() {
            return Err(DataError::ShapeMismatch {
                reason: format!("{} names for {} columns", names.len(), columns.len()),
            });
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            if let Some(&first) = seen.get(name.as_str()) {
                return Err(DataError::DuplicateColumn {
                    name: name.clone(),
                    first,
                    second: i,
                });
            }
            seen.insert(name.as_str(), i);
        }
        let n_rows = columns.first().map_or(0, Column::len);
        if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(DataError::ShapeMismatch {
                reason: format!(
                    "column \"{}\" has {} rows, expected {n_rows}",
                    names[i],
                    col.len()
                ),
            });
        }
        Ok(Self {
            names,
            columns,
            n_rows,
        })
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name` in column order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Table without the named columns.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownColumn`] if any name is absent.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, DataError> {
        for name in names {
            if self.position(name.as_ref()).is_none() {
                return Err(DataError::UnknownColumn {
                    name: name.as_ref().to_string(),
                });
            }
        }
        let (kept_names, kept_columns): (Vec<String>, Vec<Column>) = self
            .iter()
            .filter(|(n, _)| !names.iter().any(|d| d.as_ref() == *n))
            .map(|(n, c)| (n.to_string(), c.clone()))
            .unzip();
        Ok(Table {
            names: kept_names,
            columns: kept_columns,
            n_rows: self.n_rows,
        })
    }

    /// Replace each categorical column (other than those in `keep`) with
    /// boolean indicator columns named `{column}_{value}`.
    ///
    /// Non-categorical and kept columns stay at the front in their original
    /// order; indicators follow, grouped by source column, values sorted.
    /// A missing cell sets no indicator. Returns the new table and the names
    /// of the encoded columns.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DuplicateColumn`] if an indicator name collides
    /// with an existing column.
    pub fn one_hot<S: AsRef<str>>(&self, keep: &[S]) -> Result<(Table, Vec<String>), DataError> {
        let mut names = Vec::new();
        let mut columns = Vec::new();
        let mut indicators = Vec::new();
        let mut encoded = Vec::new();

        for (name, column) in self.iter() {
            match column {
                Column::Categorical(values) if !keep.iter().any(|k| k.as_ref() == name) => {
                    let mut levels: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
                    levels.sort_unstable();
                    levels.dedup();
                    for level in levels {
                        let flags = values
                            .iter()
                            .map(|v| Some(v.as_deref() == Some(level)))
                            .collect();
                        indicators.push((format!("{name}_{level}"), Column::Boolean(flags)));
                    }
                    encoded.push(name.to_string());
                }
                _ => {
                    names.push(name.to_string());
                    columns.push(column.clone());
                }
            }
        }
        for (name, column) in indicators {
            names.push(name);
            columns.push(column);
        }
        Ok((Table::new(names, columns)?, encoded))
    }

    /// Drop rows with a missing cell in any non-categorical column.
    ///
    /// Returns the filtered table and the number of rows removed.
    #[must_use]
    pub fn drop_missing(&self) -> (Table, usize) {
        let keep: Vec<bool> = (0..self.n_rows)
            .map(|r| {
                self.columns
                    .iter()
                    .filter(|c| !c.is_categorical())
                    .all(|c| !c.is_missing(r))
            })
            .collect();
        let kept = keep.iter().filter(|&&k| k).count();
        let table = Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.filter_rows(&keep)).collect(),
            n_rows: kept,
        };
        (table, self.n_rows - kept)
    }
}

/// A numeric feature matrix with one class label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Build a dataset, checking that rows, widths and labels agree.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ShapeMismatch`] if `features.len() != labels.len()`
    /// or a row's width differs from `feature_names.len()`.
    pub fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<usize>,
    ) -> Result<Self, DataError> {
        if features.len() != labels.len() {
            return Err(DataError::ShapeMismatch {
                reason: format!("{} feature rows but {} labels", features.len(), labels.len()),
            });
        }
        if let Some((i, row)) = features
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != feature_names.len())
        {
            return Err(DataError::ShapeMismatch {
                reason: format!(
                    "row {i} has {} values, expected {}",
                    row.len(),
                    feature_names.len()
                ),
            });
        }
        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Rows at `indices`, in that order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, DataError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DataError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample() -> Table {
        Table::new(
            names(&["age", "city", "smoker"]),
            vec![
                Column::Numeric(vec![Some(21.0), None, Some(30.0)]),
                Column::Categorical(vec![Some("Pune".into()), Some("Agra".into()), None]),
                Column::Boolean(vec![Some(true), Some(false), Some(false)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = Table::new(
            names(&["a", "a"]),
            vec![Column::Numeric(vec![]), Column::Numeric(vec![])],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { first: 0, second: 1, .. }));
    }

    #[test]
    fn ragged_columns_rejected() {
        let err = Table::new(
            names(&["a", "b"]),
            vec![Column::Numeric(vec![Some(1.0)]), Column::Numeric(vec![])],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch { .. }));
    }

    #[test]
    fn drop_columns_checks_names() {
        let table = sample();
        let dropped = table.drop_columns(&["city"]).unwrap();
        assert_eq!(dropped.column_names(), &names(&["age", "smoker"])[..]);
        assert!(matches!(
            table.drop_columns(&["zip"]),
            Err(DataError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn one_hot_appends_sorted_indicators() {
        let (encoded, sources) = sample().one_hot::<&str>(&[]).unwrap();
        assert_eq!(
            encoded.column_names(),
            &names(&["age", "smoker", "city_Agra", "city_Pune"])[..]
        );
        assert_eq!(sources, names(&["city"]));
        assert_eq!(
            encoded.column("city_Pune"),
            Some(&Column::Boolean(vec![Some(true), Some(false), Some(false)]))
        );
        // a missing category sets no indicator
        assert_eq!(encoded.column("city_Agra").unwrap().cell(2), Cell::Flag(false));
    }

    #[test]
    fn drop_missing_ignores_categorical_columns() {
        let (table, removed) = sample().drop_missing();
        assert_eq!(removed, 1);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("age").unwrap().cell(1), Cell::Number(30.0));
    }

    #[test]
    fn dataset_shape_checked() {
        assert!(Dataset::new(names(&["x"]), vec![vec![1.0]], vec![0, 1]).is_err());
        assert!(Dataset::new(names(&["x"]), vec![vec![1.0, 2.0]], vec![0]).is_err());
        let ds = Dataset::new(names(&["x"]), vec![vec![1.0], vec![2.0]], vec![0, 1]).unwrap();
        assert_eq!(ds.select(&[1]).features(), &[vec![2.0]]);
    }

    #[test]
    fn experiment_name_validation() {
        assert!(ExperimentName::new("run-01_a".to_string()).is_ok());
        assert!(ExperimentName::new(String::new()).is_err());
        assert!(ExperimentName::new("bad name!".to_string()).is_err());
    }
}
