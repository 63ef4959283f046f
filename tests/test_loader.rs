//! Integration test: CSV loading into a selection run

use model_select::config::SelectionConfig;
use model_select::optimizer::HyperparameterGrid;
use model_select::selection::ModelSelection;
use model_select::training::ModelFamily;
use model_select::utils::{DataLoader, LoadingConfig};
use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;

/// Census-like CSV: numeric, categorical and id columns plus a few '?' cells
fn census_csv(n: usize) -> NamedTempFile {
    let mut contents = String::from("id,age,hours,sector,region,income\n");
    for i in 0..n {
        let high = i % 2 == 1;
        let age = if high { 45 + i % 15 } else { 20 + i % 15 };
        let hours = (if high { 50 } else { 30 }) + i % 7;
        let sector = ["Private", "Public", "Self"][i % 3];
        let region = if i % 17 == 0 { "?" } else { ["north", "south"][i % 2] };
        let income = if high { ">50K" } else { "<=50K" };
        let _ = writeln!(contents, "{},{},{},{},{},{}", i, age, hours, sector, region, income);
    }

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn loading_config() -> LoadingConfig {
    LoadingConfig::new("income")
        .with_drop_columns(vec!["id".to_string()])
        .with_one_hot_columns(vec!["sector".to_string(), "region".to_string()])
}

#[test]
fn test_load_census_like_csv() {
    let file = census_csv(170);
    let ds = DataLoader::new(loading_config()).load(file.path()).unwrap();

    // Rows 0, 17, ..., 153 have a missing region
    assert_eq!(ds.n_samples(), 160);
    assert_eq!(ds.class_names, vec!["<=50K", ">50K"]);
    assert_eq!(
        ds.feature_names,
        vec!["age", "hours", "sector_Public", "sector_Self", "region_south"]
    );
    assert_eq!(ds.class_counts().iter().sum::<usize>(), 160);
    assert!(ds.features.iter().all(|v| v.is_finite()));
}

#[test]
fn test_loaded_data_runs_through_selection() {
    let file = census_csv(200);
    let ds = DataLoader::new(loading_config()).load(file.path()).unwrap();

    let grid = HyperparameterGrid::new()
        .int("n_estimators", &[10])
        .int("max_depth", &[4]);
    let report = ModelSelection::new(SelectionConfig::new().with_cv_folds(3).with_validation_folds(3))
        .with_grid(ModelFamily::RandomForest, grid)
        .run(&ds, &[ModelFamily::RandomForest])
        .unwrap();

    let family = &report.families[0];
    assert!(family.search.best_score > 0.9);
    assert_eq!(report.class_names, ds.class_names);
}

#[test]
fn test_file_info_counts_missing_rows() {
    let file = census_csv(34);
    let info = DataLoader::file_info(file.path()).unwrap();

    assert_eq!(info.n_rows, 34);
    assert_eq!(info.n_rows_with_missing, 2);
    assert_eq!(info.columns[0].0, "id");
}
