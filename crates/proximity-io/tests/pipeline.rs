//! End-to-end integration tests: CSV -> encode -> train -> evaluate -> JSON/model.

use std::fs;
use std::path::{Path, PathBuf};

use proximity_forest::{ForestConfig, ProximityForest};
use proximity_io::{ClassEncoder, ExperimentName, IoError, LabeledSeriesReader, ResultWriter};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn evaluate_round_trip() {
    // 1. Read train and test CSVs
    let train_rows = LabeledSeriesReader::new(&fixture_path("shapes_train.csv"))
        .read()
        .expect("train fixture should parse");
    let test_rows = LabeledSeriesReader::new(&fixture_path("shapes_test.csv"))
        .read()
        .expect("test fixture should parse");
    assert_eq!(train_rows.len(), 18);
    assert_eq!(test_rows.len(), 12);
    assert_eq!(train_rows.series_length(), 12);

    // 2. Encode labels from the training file only
    let classes = ClassEncoder::fit(&train_rows.labels);
    assert_eq!(classes.classes(), &["flat", "ramp", "wave"]);
    let train = classes.to_dataset(&train_rows).unwrap();
    let test = classes.to_dataset(&test_rows).unwrap();

    // 3. Train and evaluate
    let result = ForestConfig::new(10).unwrap().with_seed(42).fit(&train).unwrap();
    let evaluation = result
        .forest()
        .evaluate(&test, &mut ChaCha8Rng::seed_from_u64(42))
        .unwrap();
    assert!(
        evaluation.accuracy > 0.8,
        "accuracy {} on well separated shapes",
        evaluation.accuracy
    );

    // 4. Write artifacts
    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("shapes_rt".into()).unwrap())
        .unwrap();
    result.forest().save(writer.model_path()).unwrap();
    writer.write_results(&result, &evaluation, &classes).unwrap();
    writer.write_classes(&classes).unwrap();
    writer
        .write_predictions(
            &evaluation.predictions,
            Some(&classes),
            Some(&test_rows.labels),
            evaluation.n_ties,
        )
        .unwrap();

    // 5. Read everything back
    let results: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("shapes_rt_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(results["experiment"], "shapes_rt");
    assert_eq!(results["n_test"], 12);
    assert_eq!(results["class_labels"].as_array().unwrap().len(), 3);
    let matrix_total: u64 = results["confusion_matrix"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap().iter().map(|v| v.as_u64().unwrap()))
        .sum();
    assert_eq!(matrix_total, 12);
    assert_eq!(results["training"]["n_samples"], 18);

    let predictions: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("shapes_rt_predictions.json")).unwrap(),
    )
    .unwrap();
    let entries = predictions["predictions"].as_array().unwrap();
    assert_eq!(entries.len(), 12);
    for entry in entries {
        assert!(entry["predicted_label"].is_string());
        assert!(entry["true_label"].is_string());
    }

    // 6. The saved model and class file reproduce the predictions
    let loaded = ProximityForest::load(writer.model_path()).unwrap();
    let reloaded_classes =
        ClassEncoder::load(&dir.path().join("shapes_rt_classes.json")).unwrap();
    assert_eq!(reloaded_classes, classes);
    let again = loaded
        .evaluate(&test, &mut ChaCha8Rng::seed_from_u64(42))
        .unwrap();
    assert_eq!(again.predictions, evaluation.predictions);
}

#[test]
fn header_and_numeric_labels() {
    let rows = LabeledSeriesReader::new(&fixture_path("header_3x4.csv"))
        .with_header(true)
        .read()
        .unwrap();
    let classes = ClassEncoder::fit(&rows.labels);
    assert_eq!(classes.classes(), &["2", "10"]);
    let ds = classes.to_dataset(&rows).unwrap();
    assert_eq!(ds.labels(), &[0, 1, 0]);
    assert_eq!(ds.series_length(), 4);
}

#[test]
fn ragged_file_is_rejected() {
    let result = LabeledSeriesReader::new(&fixture_path("ragged.csv")).read();
    assert!(matches!(
        result,
        Err(IoError::InconsistentRowLength { row_index: 1, .. })
    ));
}

#[test]
fn test_label_unseen_in_training_is_rejected() {
    let rows = LabeledSeriesReader::new(&fixture_path("shapes_test.csv"))
        .read()
        .unwrap();
    let classes = ClassEncoder::fit(&["flat", "ramp"]);
    assert!(matches!(
        classes.to_dataset(&rows),
        Err(IoError::UnknownLabel { .. })
    ));
}
