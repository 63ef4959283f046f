//! Integration test: train/validation/test split and fold assignment

use model_select::data::{train_val_test_split, Dataset, SplitRatios};
use model_select::error::SelectionError;
use model_select::training::{CVStrategy, CrossValidator};
use ndarray::{Array1, Array2};

fn dataset(n: usize) -> Dataset {
    let features = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f64);
    let labels = Array1::from_shape_fn(n, |i| (i % 4) as f64);
    Dataset::from_arrays(features, labels).unwrap()
}

#[test]
fn test_default_proportions_on_100_records() {
    let split = dataset(100).split(&SplitRatios::default(), 42).unwrap();

    assert_eq!(split.indices.sizes(), [70, 20, 10]);
    assert_eq!(split.train.n_samples(), 70);
    assert_eq!(split.validation.n_samples(), 20);
    assert_eq!(split.test.n_samples(), 10);
}

#[test]
fn test_partition_rows_follow_indices() {
    let ds = dataset(30);
    let split = ds.split(&SplitRatios::default(), 9).unwrap();

    for (row, &source) in split.test.features.rows().into_iter().zip(&split.indices.test) {
        assert_eq!(row, ds.features.row(source));
    }
    assert_eq!(split.train.class_names, ds.class_names);
}

#[test]
fn test_split_is_reproducible_and_covers_everything() {
    let a = train_val_test_split(257, &SplitRatios::new(0.6, 0.25, 0.15), 42).unwrap();
    let b = train_val_test_split(257, &SplitRatios::new(0.6, 0.25, 0.15), 42).unwrap();
    assert_eq!(a, b);

    let mut seen = vec![false; 257];
    for &i in a.train.iter().chain(&a.validation).chain(&a.test) {
        assert!(!seen[i], "row {} assigned twice", i);
        seen[i] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_too_few_records() {
    let result = dataset(3).split(&SplitRatios::default(), 42);
    assert!(matches!(result, Err(SelectionError::EmptyPartition { .. })));
}

#[test]
fn test_every_row_held_out_exactly_once() {
    let labels = Array1::from_shape_fn(103, |i| (i % 3) as f64);

    for strategy in [
        CVStrategy::KFold { n_splits: 5, shuffle: true },
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true },
    ] {
        let splits = CrossValidator::new(strategy).split(&labels).unwrap();
        assert_eq!(splits.len(), 5);

        let mut held_out = vec![0usize; 103];
        for split in &splits {
            for &i in &split.test_indices {
                held_out[i] += 1;
                assert!(!split.train_indices.contains(&i));
            }
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 103);
        }
        assert!(held_out.iter().all(|&c| c == 1));
    }
}

#[test]
fn test_stratified_folds_keep_proportions() {
    // 60 rows of class 0, 30 of class 1
    let labels = Array1::from_shape_fn(90, |i| if i % 3 == 2 { 1.0 } else { 0.0 });
    let splits = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true })
        .split(&labels)
        .unwrap();

    for split in &splits {
        let ones = split.test_indices.iter().filter(|&&i| labels[i] == 1.0).count();
        assert_eq!(split.test_indices.len(), 30);
        assert_eq!(ones, 10);
    }
}
