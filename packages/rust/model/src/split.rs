//! Deterministic train/test splitting.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use leadscore_shared::{LeadScoreError, Result};

/// A train/test partition of a feature matrix and label vector.
#[derive(Debug)]
pub struct TrainTestSplit {
    pub x_train: Vec<Vec<f64>>,
    pub x_test: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

/// Shuffle with a fixed seed and split off `test_fraction` of the rows.
///
/// The same seed and inputs always produce the same partition.
pub fn train_test_split(
    x: &[Vec<f64>],
    y: &[f64],
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.len() != y.len() {
        return Err(LeadScoreError::Training(format!(
            "{} feature rows for {} labels",
            x.len(),
            y.len()
        )));
    }
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(LeadScoreError::Training(format!(
            "test_fraction {test_fraction} outside [0, 1)"
        )));
    }

    let mut indices: Vec<usize> = (0..x.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = (x.len() as f64 * test_fraction).round() as usize;
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: train_idx.iter().map(|&i| x[i].clone()).collect(),
        x_test: test_idx.iter().map(|&i| x[i].clone()).collect(),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        (x, y)
    }

    #[test]
    fn split_sizes_match_fraction() {
        let (x, y) = data(100);
        let split = train_test_split(&x, &y, 0.2, 100).unwrap();
        assert_eq!(split.x_test.len(), 20);
        assert_eq!(split.x_train.len(), 80);
        assert_eq!(split.y_test.len(), 20);
        assert_eq!(split.y_train.len(), 80);
    }

    #[test]
    fn same_seed_same_partition() {
        let (x, y) = data(50);
        let a = train_test_split(&x, &y, 0.3, 42).unwrap();
        let b = train_test_split(&x, &y, 0.3, 42).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn different_seed_different_partition() {
        let (x, y) = data(50);
        let a = train_test_split(&x, &y, 0.3, 1).unwrap();
        let b = train_test_split(&x, &y, 0.3, 2).unwrap();
        assert_ne!(a.x_test, b.x_test);
    }

    #[test]
    fn partition_preserves_pairing() {
        let (x, y) = data(30);
        let split = train_test_split(&x, &y, 0.5, 7).unwrap();
        for (row, label) in split.x_train.iter().zip(&split.y_train) {
            assert_eq!(row[0] as usize % 2, *label as usize);
        }
    }

    #[test]
    fn invalid_fraction_rejected() {
        let (x, y) = data(10);
        assert!(train_test_split(&x, &y, 1.0, 0).is_err());
        assert!(train_test_split(&x, &y, -0.1, 0).is_err());
    }
}
