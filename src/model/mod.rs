//! Classifier stage: dataset assembly from persisted feature tables and the
//! Random Forest wrapper.

pub mod random_forest;

use std::fs;

use anyhow::{ensure, Context, Result};
use tracing::warn;

use crate::store::{self, DataStore};
use crate::types::{Partition, WindowConfig};
use random_forest::SplitData;

/// Every N-th assembled row goes to the development split.
const DEV_FOLD: usize = 5;

/// Map a diagnosis label to a class index. The mapping is binary with the
/// same non-"AD" default branch as the partition mapping.
pub fn class_index(label: &str) -> u32 {
    if label == "AD" {
        1
    } else {
        0
    }
}

/// Train/dev matrices assembled from the feature CSVs on disk.
#[derive(Debug, Clone, Default)]
pub struct DatasetSplits {
    pub train: SplitData,
    pub dev: SplitData,
    pub feature_columns: Vec<String>,
}

/// Scan both partitions' feature directories for tables written with the
/// given window configuration and concatenate them into train/dev splits.
///
/// Rows are assigned deterministically: every fifth row lands in the dev
/// split, the rest in train. Tables without a `Label` column are skipped
/// with a warning; mismatched column sets are an error.
pub fn assemble_dataset(store: &DataStore, window: WindowConfig) -> Result<DatasetSplits> {
    let suffix = format!("_{}_features.csv", window.filename_fragment());
    let mut splits = DatasetSplits::default();
    let mut row_index = 0usize;

    for partition in Partition::ALL {
        let dir = store.features_dir(partition);
        if !dir.exists() {
            warn!("feature directory {} does not exist", dir.display());
            continue;
        }

        let mut paths: Vec<_> = fs::read_dir(&dir)
            .with_context(|| format!("failed to read feature directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&suffix))
            })
            .collect();
        paths.sort();

        for path in paths {
            let table = store::read_feature_table(&path)?;
            if table.is_empty() {
                continue;
            }
            if !table.has_labels() {
                warn!("feature table {} has no Label column; skipped", path.display());
                continue;
            }

            if splits.feature_columns.is_empty() {
                splits.feature_columns = table.columns.clone();
            } else {
                ensure!(
                    splits.feature_columns == table.columns,
                    "feature table {} columns do not match the rest of the dataset",
                    path.display()
                );
            }

            for (row, label) in table.rows.iter().zip(table.labels.iter()) {
                let side = if row_index % DEV_FOLD == 0 {
                    &mut splits.dev
                } else {
                    &mut splits.train
                };
                side.features.push(row.clone());
                side.targets.push(class_index(label));
                row_index += 1;
            }
        }
    }

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureTable;

    fn window() -> WindowConfig {
        WindowConfig {
            n_fft: 2048,
            hop_length: 512,
        }
    }

    fn table_with_rows(count: usize, value: f64, label: &str) -> FeatureTable {
        let mut table = FeatureTable::new(vec!["a".into(), "b".into()]);
        for i in 0..count {
            table.push_row(vec![value, i as f64]).unwrap();
        }
        table.attach_label(label);
        table
    }

    #[test]
    fn class_index_is_binary_with_zero_default() {
        assert_eq!(class_index("AD"), 1);
        for other in ["CN", "ad", "", "unknown"] {
            assert_eq!(class_index(other), 0, "input {:?}", other);
        }
    }

    #[test]
    fn assembles_and_splits_rows_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());

        store
            .save_features(Partition::Ad, "one", &table_with_rows(6, 1.0, "AD"), window())
            .unwrap();
        store
            .save_features(Partition::Cn, "two", &table_with_rows(4, 2.0, "CN"), window())
            .unwrap();

        let splits = assemble_dataset(&store, window()).unwrap();
        // Rows 0 and 5 of the 10 total land in dev.
        assert_eq!(splits.dev.len(), 2);
        assert_eq!(splits.train.len(), 8);
        assert_eq!(splits.feature_columns, vec!["a", "b"]);

        let total_ad = splits
            .train
            .targets
            .iter()
            .chain(splits.dev.targets.iter())
            .filter(|&&t| t == 1)
            .count();
        assert_eq!(total_ad, 6);
    }

    #[test]
    fn ignores_tables_for_other_window_configs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let other = WindowConfig {
            n_fft: 1024,
            hop_length: 256,
        };

        store
            .save_features(Partition::Ad, "one", &table_with_rows(3, 1.0, "AD"), other)
            .unwrap();

        let splits = assemble_dataset(&store, window()).unwrap();
        assert!(splits.train.is_empty());
        assert!(splits.dev.is_empty());
    }

    #[test]
    fn mismatched_columns_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());

        store
            .save_features(Partition::Ad, "one", &table_with_rows(2, 1.0, "AD"), window())
            .unwrap();
        let mut wide = FeatureTable::new(vec!["a".into(), "b".into(), "c".into()]);
        wide.push_row(vec![1.0, 2.0, 3.0]).unwrap();
        wide.attach_label("CN");
        store
            .save_features(Partition::Cn, "two", &wide, window())
            .unwrap();

        assert!(assemble_dataset(&store, window()).is_err());
    }
}
