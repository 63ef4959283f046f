//! Integration test: standardization inside pipelines

use model_select::preprocessing::StandardScaler;
use model_select::training::{Pipeline, RandomForestClassifier};
use ndarray::{array, Array1, Array2, Axis};

#[test]
fn test_standardized_training_data() {
    let x = Array2::from_shape_fn((50, 3), |(i, j)| (i as f64) * (j as f64 + 1.0) + 10.0 * j as f64);

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&x).unwrap();

    let mean = scaled.mean_axis(Axis(0)).unwrap();
    let std = scaled.std_axis(Axis(0), 0.0);
    for j in 0..3 {
        assert!(mean[j].abs() < 1e-10);
        assert!((std[j] - 1.0).abs() < 1e-10);
    }
}

#[test]
fn test_constant_feature_is_left_unscaled() {
    let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&x).unwrap();

    assert!(scaled.column(1).iter().all(|&v| v == 0.0));
}

#[test]
fn test_statistics_come_only_from_fit_rows() {
    let train = array![[0.0], [2.0]];
    let held_out = array![[100.0]];

    let mut scaler = StandardScaler::new();
    scaler.fit(&train).unwrap();

    // Mean 1, std 1 from the training rows only
    assert_eq!(scaler.transform(&held_out).unwrap(), array![[99.0]]);
    assert_eq!(scaler.mean().unwrap(), &array![1.0]);
}

#[test]
fn test_pipeline_refits_scaler() {
    let x = Array2::from_shape_fn((40, 2), |(i, j)| (i % 2) as f64 * 100.0 + j as f64);
    let y = Array1::from_shape_fn(40, |i| (i % 2) as f64);

    let mut pipeline = Pipeline::new(Box::new(RandomForestClassifier::new(5)));
    assert!(!pipeline.is_fitted());
    pipeline.fit(&x, &y).unwrap();

    assert!(pipeline.is_fitted());
    assert_eq!(pipeline.scaler().mean().unwrap()[0], 50.0);
    assert_eq!(pipeline.predict(&x).unwrap(), y);
}
