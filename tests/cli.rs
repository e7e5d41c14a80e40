use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use cognilyzer::store::DataStore;
use cognilyzer::types::{FeatureTable, Partition, WindowConfig};

fn scaffold_data_tree(root: &Path) {
    for partition in ["ad", "cn"] {
        fs::create_dir_all(root.join("data").join("raw").join("audio").join(partition)).unwrap();
    }
    fs::create_dir_all(root.join("data").join("raw").join("segmentation")).unwrap();
}

fn cognilyzer() -> Command {
    Command::cargo_bin("cognilyzer").unwrap()
}

#[test]
fn preprocess_walks_both_partitions() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_data_tree(dir.path());

    cognilyzer()
        .args(["preprocess", "--data-root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing partition: ad"))
        .stdout(predicate::str::contains("Processing partition: cn"))
        .stdout(predicate::str::contains("Preprocessing complete."));
}

#[test]
fn preprocess_rejects_a_missing_data_root() {
    cognilyzer()
        .args(["preprocess", "--data-root", "/does/not/exist"])
        .assert()
        .failure();
}

#[test]
fn train_reports_accuracy_on_persisted_features() {
    let dir = tempfile::tempdir().unwrap();
    let store = DataStore::new(dir.path());
    let window = WindowConfig {
        n_fft: 2048,
        hop_length: 512,
    };

    // Two separable clusters so the forest has something learnable.
    let mut ad = FeatureTable::new(vec!["x".into(), "y".into()]);
    let mut cn = FeatureTable::new(vec!["x".into(), "y".into()]);
    for i in 0..25 {
        let jitter = (i % 5) as f64 * 0.05;
        ad.push_row(vec![5.0 + jitter, 5.5 - jitter]).unwrap();
        cn.push_row(vec![0.0 + jitter, 0.5 - jitter]).unwrap();
    }
    ad.attach_label("AD");
    cn.attach_label("CN");
    store
        .save_features(Partition::Ad, "bundle", &ad, window)
        .unwrap();
    store
        .save_features(Partition::Cn, "bundle", &cn, window)
        .unwrap();

    let config_path = dir.path().join("rf.json");
    fs::write(
        &config_path,
        r#"{"parameters": {"n_estimators": 10, "max_depth": 5,
            "max_features": "sqrt", "criterion": "gini"}}"#,
    )
    .unwrap();
    let manifest_path = dir.path().join("paths.json");
    fs::write(&manifest_path, r#"{"features": "data/processed/features"}"#).unwrap();

    cognilyzer()
        .args(["train", "--data-root"])
        .arg(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--data-paths")
        .arg(&manifest_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Training a Random Forest classifier"))
        .stdout(predicate::str::contains("Accuracy on training set:"))
        .stdout(predicate::str::contains("Accuracy on development set:"));
}

#[test]
fn train_fails_cleanly_without_feature_tables() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_data_tree(dir.path());

    let config_path = dir.path().join("rf.json");
    fs::write(&config_path, r#"{"parameters": {}}"#).unwrap();
    let manifest_path = dir.path().join("paths.json");
    fs::write(&manifest_path, "{}").unwrap();

    cognilyzer()
        .args(["train", "--data-root"])
        .arg(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--data-paths")
        .arg(&manifest_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no labeled feature rows"));
}
