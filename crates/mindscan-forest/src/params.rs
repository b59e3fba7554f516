//! Discrete hyperparameter grids.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;

/// One candidate value for a hyperparameter.
///
/// Deserializes from a JSON integer, string, or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(usize),
    Text(String),
    /// The unlimited / "None" setting.
    Absent,
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<Option<usize>> for ParamValue {
    fn from(v: Option<usize>) -> Self {
        v.map_or(ParamValue::Absent, ParamValue::Int)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Absent => f.write_str("None"),
        }
    }
}

/// Map from parameter name to its ordered candidate values.
///
/// Keys iterate in sorted order, so combination `i` is stable for a given grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter's candidate list.
    #[must_use]
    pub fn with<V: Into<ParamValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.params
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of parameters (not combinations).
    #[must_use]
    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    /// Size of the Cartesian product.
    ///
    /// # Errors
    ///
    /// [`ForestError::InvalidGrid`] when the grid is empty, a parameter has
    /// no candidates, or the product overflows.
    pub fn n_combinations(&self) -> Result<usize, ForestError> {
        if self.params.is_empty() {
            return Err(ForestError::InvalidGrid {
                reason: "grid has no parameters".to_string(),
            });
        }
        self.params.iter().try_fold(1usize, |acc, (name, values)| {
            if values.is_empty() {
                return Err(ForestError::InvalidGrid {
                    reason: format!("parameter \"{name}\" has no candidate values"),
                });
            }
            acc.checked_mul(values.len()).ok_or_else(|| ForestError::InvalidGrid {
                reason: "too many combinations".to_string(),
            })
        })
    }

    /// Decode combination `index` (mixed radix, last key varies fastest).
    ///
    /// Returns `None` if `index` is out of range.
    #[must_use]
    pub fn combination(&self, index: usize) -> Option<ParamSet> {
        let total = self.n_combinations().ok()?;
        if index >= total {
            return None;
        }
        let mut rest = index;
        let mut values = BTreeMap::new();
        for (name, candidates) in self.params.iter().rev() {
            values.insert(name.clone(), candidates[rest % candidates.len()].clone());
            rest /= candidates.len();
        }
        Some(ParamSet { values })
    }
}

/// One concrete assignment drawn from a [`ParamGrid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
