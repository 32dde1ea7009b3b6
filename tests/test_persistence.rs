//! Integration test: saving and loading a fitted preprocessor

use polars::prelude::*;
use serde_json::json;
use tabprep::prelude::*;

fn features() -> Vec<FeatureConfig> {
    vec![
        FeatureConfig::new("age", FeatureType::Int32)
            .with_step("imputation_strategy", "constant:0")
            .with_step("discretizer", "kmeans:3"),
        FeatureConfig::new("income", FeatureType::Float64)
            .with_step("limits", json!([0, null]))
            .with_step("transformation", "log1p")
            .with_step("scaler", "standard"),
        FeatureConfig::new("notes", FeatureType::Text).inactive(),
    ]
}

fn train_df() -> DataFrame {
    df!(
        "age" => &[Some(18i64), Some(22), None, Some(35), Some(41), Some(58), Some(63), Some(70)],
        "income" => &[-10.0, 1200.0, 3400.0, 5600.0, 7800.0, 9900.0, 12000.0, 15000.0],
        "notes" => &["a", "b", "c", "d", "e", "f", "g", "h"],
    )
    .unwrap()
}

#[test]
fn test_loaded_preprocessor_transforms_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessor.json");

    let mut preprocessor = PreProcessor::new(features());
    let expected = preprocessor.fit_transform(&train_df(), None).unwrap();
    preprocessor.save(&path).unwrap();

    let loaded = PreProcessor::load(&path).unwrap();
    assert!(loaded.is_fitted());
    assert_eq!(loaded.feature_names(), preprocessor.feature_names());
    assert_eq!(loaded.action_plan(), preprocessor.action_plan());

    let restored = loaded.transform(&train_df()).unwrap();
    assert!(restored.equals_missing(&expected));

    let unseen = df!(
        "age" => &[None, Some(99i64)],
        "income" => &[500.0, 20000.0],
        "notes" => &["x", "y"],
    )
    .unwrap();
    let from_original = preprocessor.transform(&unseen).unwrap();
    let from_loaded = loaded.transform(&unseen).unwrap();
    assert!(from_loaded.equals_missing(&from_original));
    assert_eq!(from_loaded.column("age").unwrap().dtype(), &DataType::Int32);
}

#[test]
fn test_non_finite_statistics_fail_fit_instead_of_save() {
    let df = df!("x" => &[0.0, 1.0, 10.0]).unwrap();
    let log_then_scale = vec![FeatureConfig::new("x", FeatureType::Float64)
        .with_step("transformation", "log")
        .with_step("scaler", "min_max")];
    let mut preprocessor = PreProcessor::new(log_then_scale);
    let err = preprocessor.fit(&df, None).unwrap_err();
    assert!(matches!(err, PrepError::DataError(_)), "got {err}");
    assert!(!preprocessor.is_fitted());

    let df = df!("x" => &[Some(f64::INFINITY), None, Some(1.0)]).unwrap();
    let mean = vec![FeatureConfig::new("x", FeatureType::Float64).with_step("imputation_strategy", "mean")];
    let err = PreProcessor::new(mean).fit(&df, None).unwrap_err();
    assert!(matches!(err, PrepError::DataError(_)), "got {err}");
}

#[test]
fn test_finite_fit_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessor.json");
    let df = df!("x" => &[1.0, 2.0, 10.0]).unwrap();
    let features = vec![FeatureConfig::new("x", FeatureType::Float64)
        .with_step("transformation", "log")
        .with_step("scaler", "min_max")];

    let mut preprocessor = PreProcessor::new(features);
    let expected = preprocessor.fit_transform(&df, None).unwrap();
    preprocessor.save(&path).unwrap();

    let loaded = PreProcessor::load(&path).unwrap();
    assert!(loaded.transform(&df).unwrap().equals_missing(&expected));
}

#[test]
fn test_unfitted_preprocessor_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config_only.json");

    PreProcessor::new(features()).save(&path).unwrap();
    let loaded = PreProcessor::load(&path).unwrap();

    assert!(!loaded.is_fitted());
    assert_eq!(loaded.features_config(), features().as_slice());
    assert!(matches!(loaded.transform(&train_df()), Err(PrepError::ModelNotFitted)));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PreProcessor::load(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, PrepError::IoError(_)));
}

#[test]
fn test_load_garbage_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = PreProcessor::load(&path).unwrap_err();
    assert!(matches!(err, PrepError::SerializationError(_)));
}
