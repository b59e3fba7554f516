//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::DataError;
use crate::domain::Dataset;

/// Both sides of a split plus the original row indices of each.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Number of test rows for `fraction` of `n_rows`: rounded, then clamped
/// so both sides keep at least one row.
fn test_count(n_rows: usize, fraction: f64) -> usize {
    ((fraction * n_rows as f64).round() as usize).clamp(1, n_rows - 1)
}

/// Shuffle row indices with a ChaCha8 stream seeded by `seed`; the first
/// `round(fraction * n)` become the test side. Both sides keep the shuffled order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::InvalidTestFraction`] | `fraction` not strictly inside (0, 1) |
/// | [`DataError::TooFewRows`] | Fewer than 2 rows |
#[instrument(skip(dataset), fields(n_rows = dataset.n_samples()))]
pub fn train_test_split(
    dataset: &Dataset,
    fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, DataError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(DataError::InvalidTestFraction { fraction });
    }
    let n_rows = dataset.n_samples();
    if n_rows < 2 {
        return Err(DataError::TooFewRows { n_rows });
    }

    let mut order: Vec<usize> = (0..n_rows).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train_indices = order.split_off(test_count(n_rows, fraction));
    let test_indices = order;

    debug!(n_train = train_indices.len(), n_test = test_indices.len(), "rows partitioned");

    Ok(TrainTestSplit {
        train: dataset.select(&train_indices),
        test: dataset.select(&test_indices),
        train_indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> Dataset {
        Dataset::new(
            vec!["x".to_string()],
            (0..n).map(|i| vec![i as f64]).collect(),
            (0..n).map(|i| i % 2).collect(),
        )
        .unwrap()
    }

    #[test]
    fn sizes_follow_the_fraction() {
        let split = train_test_split(&dataset(100), 0.3, 99).unwrap();
        assert_eq!(split.test.n_samples(), 30);
        assert_eq!(split.train.n_samples(), 70);
        let split = train_test_split(&dataset(10), 0.25, 1).unwrap();
        assert_eq!(split.test.n_samples(), 3);
    }

    #[test]
    fn indices_partition_every_row() {
        let split = train_test_split(&dataset(57), 0.2, 17).unwrap();
        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(&split.test_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..57).collect::<Vec<_>>());
    }

    #[test]
    fn rows_stay_aligned_with_labels() {
        let data = dataset(40);
        let split = train_test_split(&data, 0.3, 5).unwrap();
        for (pos, &orig) in split.test_indices.iter().enumerate() {
            assert_eq!(split.test.features()[pos][0], orig as f64);
            assert_eq!(split.test.labels()[pos], orig % 2);
        }
    }

    #[test]
    fn same_seed_same_membership() {
        let a = train_test_split(&dataset(80), 0.3, 99).unwrap();
        let b = train_test_split(&dataset(80), 0.3, 99).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        let c = train_test_split(&dataset(80), 0.3, 100).unwrap();
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn tiny_fractions_still_leave_one_test_row() {
        let split = train_test_split(&dataset(5), 0.01, 0).unwrap();
        assert_eq!(split.test.n_samples(), 1);
        let split = train_test_split(&dataset(5), 0.99, 0).unwrap();
        assert_eq!(split.train.n_samples(), 1);
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert!(matches!(
            train_test_split(&dataset(10), 0.0, 1),
            Err(DataError::InvalidTestFraction { .. })
        ));
        assert!(matches!(
            train_test_split(&dataset(10), 1.0, 1),
            Err(DataError::InvalidTestFraction { .. })
        ));
        assert!(matches!(
            train_test_split(&dataset(1), 0.5, 1),
            Err(DataError::TooFewRows { n_rows: 1 })
        ));
    }
}
