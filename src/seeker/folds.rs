//! K-fold splits for candidate scoring

use crate::error::{PrognosError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One train/validation split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Partition `n_samples` into `n_splits` shuffled folds.
///
/// Fold sizes differ by at most one. The shuffle is driven by the given
/// seed, so a study produces identical splits on every run.
pub fn k_fold_splits(n_samples: usize, n_splits: usize, seed: u64) -> Result<Vec<CvSplit>> {
    if n_splits < 2 {
        return Err(PrognosError::ValidationError(
            "cross-validation needs at least 2 folds".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(PrognosError::ValidationError(format!(
            "cannot split {n_samples} samples into {n_splits} folds"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;
    let mut splits = Vec::with_capacity(n_splits);
    let mut start = 0;
    for fold_idx in 0..n_splits {
        let size = base + usize::from(fold_idx < remainder);
        let test_indices = indices[start..start + size].to_vec();
        let train_indices = indices[..start]
            .iter()
            .chain(indices[start + size..].iter())
            .copied()
            .collect();
        splits.push(CvSplit {
            train_indices,
            test_indices,
            fold_idx,
        });
        start += size;
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_folds_partition_all_samples() {
        let splits = k_fold_splits(23, 5, 0).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen = HashSet::new();
        for split in &splits {
            for &i in &split.test_indices {
                assert!(seen.insert(i), "index {i} appears in two test folds");
            }
            let train: HashSet<usize> = split.train_indices.iter().copied().collect();
            assert!(split.test_indices.iter().all(|i| !train.contains(i)));
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 23);
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_fold_sizes_balanced() {
        let splits = k_fold_splits(23, 5, 0).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 23);
        assert!(sizes.iter().all(|&s| s == 4 || s == 5));
    }

    #[test]
    fn test_same_seed_same_splits() {
        let a = k_fold_splits(40, 4, 9).unwrap();
        let b = k_fold_splits(40, 4, 9).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.test_indices, y.test_indices);
            assert_eq!(x.train_indices, y.train_indices);
        }
    }

    #[test]
    fn test_too_few_samples_is_an_error() {
        assert!(k_fold_splits(3, 5, 0).is_err());
        assert!(k_fold_splits(10, 1, 0).is_err());
    }
}
