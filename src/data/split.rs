//! Seeded train / validation / test partitioning

use super::Dataset;
use crate::error::{Result, SelectionError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Target fractions of the train / validation / test partitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            validation: 0.20,
            test: 0.10,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, validation: f64, test: f64) -> Self {
        Self {
            train,
            validation,
            test,
        }
    }

    /// Every fraction in [0, 1] and the three summing to 1
    pub fn validate(&self) -> Result<()> {
        let parts = [self.train, self.validation, self.test];
        if parts.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(SelectionError::ConfigError(format!(
                "split fractions must lie in [0, 1], got {:?}",
                parts
            )));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(SelectionError::ConfigError(format!(
                "split fractions must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }

    /// Partition sizes for `n` records: each fraction times `n`, rounded,
    /// with the rounding remainder given to the largest partition
    pub fn sizes(&self, n: usize) -> Result<[usize; 3]> {
        self.validate()?;

        let fractions = [self.train, self.validation, self.test];
        let mut sizes = fractions.map(|p| (p * n as f64).round() as i64);

        // First of the largest fractions absorbs the remainder
        let largest = (0..3).fold(0, |best, i| if fractions[i] > fractions[best] { i } else { best });
        sizes[largest] += n as i64 - sizes.iter().sum::<i64>();

        let names = ["train", "validation", "test"];
        for (size, name) in sizes.iter().zip(names) {
            if *size <= 0 {
                return Err(SelectionError::EmptyPartition {
                    partition: name.to_string(),
                    n_samples: n,
                });
            }
        }

        Ok(sizes.map(|s| s as usize))
    }
}

/// Row indices of each partition, in shuffled order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn sizes(&self) -> [usize; 3] {
        [self.train.len(), self.validation.len(), self.test.len()]
    }
}

/// Shuffle `0..n` once with `seed` and cut it into three contiguous slices
pub fn train_val_test_split(n: usize, ratios: &SplitRatios, seed: u64) -> Result<SplitIndices> {
    let [n_train, n_val, _] = ratios.sizes(n)?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = indices.split_off(n_train + n_val);
    let validation = indices.split_off(n_train);

    Ok(SplitIndices {
        train: indices,
        validation,
        test,
    })
}

/// The three partitions of a [`Dataset`]
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Dataset,
    pub validation: Dataset,
    pub test: Dataset,
    pub indices: SplitIndices,
}

impl Dataset {
    /// Split into train / validation / test partitions
    pub fn split(&self, ratios: &SplitRatios, seed: u64) -> Result<DataSplit> {
        let indices = train_val_test_split(self.n_samples(), ratios, seed)?;
        Ok(DataSplit {
            train: self.select(&indices.train),
            validation: self.select(&indices.validation),
            test: self.select(&indices.test),
            indices,
        })
    }
}
