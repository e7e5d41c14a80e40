//! Path construction and CSV persistence for the pipeline's on-disk layout.
//!
//! Everything lives under an externally supplied data root:
//! `data/raw/audio/{ad,cn}/*.wav`, `data/raw/segmentation/{base}.csv`,
//! `data/processed/features/{ad,cn}/…`, `data/processed/labels/…`.
//!
//! Loaders follow a two-tier policy: a missing file is expected and
//! recoverable — it is logged and signaled as `Ok(None)` so callers skip
//! that unit of work — while an unreadable or malformed file propagates as
//! an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info, warn};

use crate::types::{FeatureTable, LabelRecord, Partition, SegmentRecord, WindowConfig};

/// Expected extension of raw recordings.
pub const AUDIO_EXTENSION: &str = "wav";

const LABEL_COLUMN: &str = "Label";

/// Filesystem access rooted at a caller-provided data directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn raw_audio_dir(&self, partition: Partition) -> PathBuf {
        self.root
            .join("data")
            .join("raw")
            .join("audio")
            .join(partition.dir_name())
    }

    fn segmentation_dir(&self) -> PathBuf {
        self.root.join("data").join("raw").join("segmentation")
    }

    /// Feature output directory for one partition.
    pub fn features_dir(&self, partition: Partition) -> PathBuf {
        self.root
            .join("data")
            .join("processed")
            .join("features")
            .join(partition.dir_name())
    }

    fn labels_dir(&self) -> PathBuf {
        self.root.join("data").join("processed").join("labels")
    }

    /// Full path of a raw recording given its partition and filename.
    pub fn sample_path(&self, partition: Partition, filename: &str) -> PathBuf {
        self.raw_audio_dir(partition).join(filename)
    }

    /// Canonical indexed feature filename, e.g. `ad_007_features.csv`.
    pub fn feature_filename(partition: Partition, index: usize) -> String {
        format!("{}_{:03}_features.csv", partition, index)
    }

    /// Feature filename derived from a base name and window parameters,
    /// e.g. `adrso024_2048_512_features.csv`.
    pub fn windowed_feature_filename(base_name: &str, window: WindowConfig) -> String {
        format!("{}_{}_features.csv", base_name, window.filename_fragment())
    }

    /// Resolve a recording to its path and partition label.
    ///
    /// Returns `None` with a logged warning when the file does not exist.
    pub fn resolve_audio(
        &self,
        partition: Partition,
        filename: &str,
    ) -> Option<(PathBuf, &'static str)> {
        let path = self.sample_path(partition, filename);
        debug!(path = %path.display(), "checking audio file");
        if !path.exists() {
            warn!(
                "audio file {} not found in {} directory",
                filename,
                partition.dir_name()
            );
            return None;
        }
        Some((path, partition.label()))
    }

    /// List the `.wav` filenames in a partition's audio directory, sorted.
    pub fn list_audio_files(&self, partition: Partition) -> Result<Vec<String>> {
        let dir = self.raw_audio_dir(partition);
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed to read audio directory {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry under {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if Path::new(&name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_EXTENSION))
            {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load the labels table for a partition, if it has been written.
    pub fn load_labels(&self, partition: Partition) -> Result<Option<Vec<LabelRecord>>> {
        let path = self.labels_dir().join(format!("{}_labels.csv", partition));
        if !path.exists() {
            warn!("label file for {} not found", partition);
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open labels file {}", path.display()))?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            let record: LabelRecord = record
                .with_context(|| format!("malformed label row in {}", path.display()))?;
            records.push(record);
        }
        Ok(Some(records))
    }

    /// Write the labels table for a partition, creating the directory on demand.
    pub fn save_labels(&self, partition: Partition, labels: &[LabelRecord]) -> Result<PathBuf> {
        let dir = self.labels_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create labels directory {}", dir.display()))?;
        let path = dir.join(format!("{}_labels.csv", partition));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create labels file {}", path.display()))?;
        for record in labels {
            writer
                .serialize(record)
                .with_context(|| format!("failed to write label row to {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush labels file {}", path.display()))?;
        info!("labels saved to {}", path.display());
        Ok(path)
    }

    /// Load an indexed feature table for a partition, if present.
    pub fn load_features(
        &self,
        partition: Partition,
        index: usize,
    ) -> Result<Option<FeatureTable>> {
        let filename = Self::feature_filename(partition, index);
        let path = self.features_dir(partition).join(&filename);
        if !path.exists() {
            warn!("feature file {} for {} not found", filename, partition);
            return Ok(None);
        }
        read_feature_table(&path).map(Some)
    }

    /// Load the feature table written for (base name, window config), if present.
    pub fn load_windowed_features(
        &self,
        partition: Partition,
        base_name: &str,
        window: WindowConfig,
    ) -> Result<Option<FeatureTable>> {
        let filename = Self::windowed_feature_filename(base_name, window);
        let path = self.features_dir(partition).join(&filename);
        if !path.exists() {
            warn!("feature file {} for {} not found", filename, partition);
            return Ok(None);
        }
        read_feature_table(&path).map(Some)
    }

    /// Persist a feature table under the partition's feature directory,
    /// creating it on demand.
    pub fn save_features(
        &self,
        partition: Partition,
        base_name: &str,
        table: &FeatureTable,
        window: WindowConfig,
    ) -> Result<PathBuf> {
        let dir = self.features_dir(partition);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create feature directory {}", dir.display()))?;
        let path = dir.join(Self::windowed_feature_filename(base_name, window));
        write_feature_table(&path, table)?;
        info!(
            "features saved to {} using window config {}x{}",
            path.display(),
            window.n_fft,
            window.hop_length
        );
        Ok(path)
    }

    /// Load the segmentation table for a base filename, if present.
    ///
    /// The partition does not affect the path (segmentation files are shared
    /// across cohorts); it only scopes the log message.
    pub fn load_segmentation(
        &self,
        partition: Partition,
        base_name: &str,
    ) -> Result<Option<Vec<SegmentRecord>>> {
        let path = self.segmentation_dir().join(format!("{}.csv", base_name));
        debug!(path = %path.display(), "loading segmentation file");
        if !path.exists() {
            warn!(
                "segmentation file {}.csv not found in {} directory",
                base_name,
                partition.dir_name()
            );
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open segmentation file {}", path.display()))?;
        let mut segments = Vec::new();
        for record in reader.deserialize() {
            let record: SegmentRecord = record
                .with_context(|| format!("malformed segmentation row in {}", path.display()))?;
            segments.push(record);
        }
        Ok(Some(segments))
    }
}

pub(crate) fn read_feature_table(path: &Path) -> Result<FeatureTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open feature file {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();

    let mut columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let labelled = columns.last().is_some_and(|name| name == LABEL_COLUMN);
    if labelled {
        columns.pop();
    }

    let mut table = FeatureTable::new(columns);
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed feature row in {}", path.display()))?;
        let mut values = Vec::with_capacity(table.columns.len());
        for field in record.iter().take(table.columns.len()) {
            let value: f64 = field.parse().with_context(|| {
                format!("non-numeric feature value {:?} in {}", field, path.display())
            })?;
            values.push(value);
        }
        table.push_row(values)?;
        if labelled {
            let label = record.iter().last().unwrap_or_default();
            table.labels.push(label.to_string());
        }
    }
    Ok(table)
}

fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    if table.has_labels() {
        ensure!(
            table.labels.len() == table.rows.len(),
            "feature table has {} rows but {} labels",
            table.rows.len(),
            table.labels.len()
        );
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create feature file {}", path.display()))?;

    let mut header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    if table.has_labels() {
        header.push(LABEL_COLUMN);
    }
    writer
        .write_record(&header)
        .with_context(|| format!("failed to write header to {}", path.display()))?;

    for (row, label) in table
        .rows
        .iter()
        .zip(table.labels.iter().map(Some).chain(std::iter::repeat(None)))
    {
        let mut record: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        if let Some(label) = label {
            record.push(label.clone());
        }
        writer
            .write_record(&record)
            .with_context(|| format!("failed to write feature row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush feature file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store() -> (tempfile::TempDir, DataStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = DataStore::new(dir.path());
        (dir, store)
    }

    fn window() -> WindowConfig {
        WindowConfig {
            n_fft: 2048,
            hop_length: 512,
        }
    }

    #[test]
    fn feature_filename_zero_pads_index() {
        assert_eq!(
            DataStore::feature_filename(Partition::Ad, 7),
            "ad_007_features.csv"
        );
        assert_eq!(
            DataStore::feature_filename(Partition::Cn, 123),
            "cn_123_features.csv"
        );
    }

    #[test]
    fn windowed_feature_filename_embeds_parameters() {
        assert_eq!(
            DataStore::windowed_feature_filename("adrso024", window()),
            "adrso024_2048_512_features.csv"
        );
    }

    #[test]
    fn missing_files_return_none_not_errors() {
        let (_dir, store) = store();
        assert!(store.resolve_audio(Partition::Ad, "missing.wav").is_none());
        assert!(store.load_labels(Partition::Ad).unwrap().is_none());
        assert!(store.load_features(Partition::Cn, 3).unwrap().is_none());
        assert!(store
            .load_windowed_features(Partition::Cn, "base", window())
            .unwrap()
            .is_none());
        assert!(store
            .load_segmentation(Partition::Ad, "base")
            .unwrap()
            .is_none());
    }

    #[test]
    fn feature_table_round_trips() {
        let (_dir, store) = store();
        let mut table = FeatureTable::new(vec!["f0_semitone_amean".into(), "energy_amean".into()]);
        table.push_row(vec![48.0, 0.25]).unwrap();
        table.push_row(vec![50.5, 0.5]).unwrap();
        table.attach_label("AD");

        store
            .save_features(Partition::Ad, "sample", &table, window())
            .unwrap();
        let loaded = store
            .load_windowed_features(Partition::Ad, "sample", window())
            .unwrap()
            .expect("saved table should load");

        assert_eq!(loaded, table);
    }

    #[test]
    fn labels_round_trip() {
        let (_dir, store) = store();
        let labels = vec![
            LabelRecord {
                file: "adrso024.wav".into(),
                label: "AD".into(),
            },
            LabelRecord {
                file: "adrso031.wav".into(),
                label: "AD".into(),
            },
        ];
        store.save_labels(Partition::Ad, &labels).unwrap();
        let loaded = store.load_labels(Partition::Ad).unwrap().unwrap();
        assert_eq!(loaded, labels);
    }

    #[test]
    fn segmentation_ignores_extra_columns() {
        let (dir, store) = store();
        let seg_dir = dir.path().join("data").join("raw").join("segmentation");
        fs::create_dir_all(&seg_dir).unwrap();
        fs::write(
            seg_dir.join("sample.csv"),
            "speaker,begin,end,utterance\nPAR,0.5,2.25,mhm\nINV,2.25,4.0,and then\n",
        )
        .unwrap();

        let segments = store
            .load_segmentation(Partition::Cn, "sample")
            .unwrap()
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker, "PAR");
        assert_eq!(segments[0].begin, 0.5);
        assert_eq!(segments[1].end, 4.0);
    }

    #[test]
    fn malformed_segmentation_is_an_error() {
        let (dir, store) = store();
        let seg_dir = dir.path().join("data").join("raw").join("segmentation");
        fs::create_dir_all(&seg_dir).unwrap();
        fs::write(
            seg_dir.join("broken.csv"),
            "speaker,begin,end\nPAR,zero,1.0\n",
        )
        .unwrap();

        assert!(store.load_segmentation(Partition::Ad, "broken").is_err());
    }

    #[test]
    fn audio_listing_filters_and_sorts() {
        let (dir, store) = store();
        let audio_dir = dir
            .path()
            .join("data")
            .join("raw")
            .join("audio")
            .join("cn");
        fs::create_dir_all(&audio_dir).unwrap();
        for name in ["b.wav", "a.wav", "notes.txt", "c.WAV"] {
            fs::write(audio_dir.join(name), b"").unwrap();
        }

        let files = store.list_audio_files(Partition::Cn).unwrap();
        assert_eq!(files, vec!["a.wav", "b.wav", "c.WAV"]);
    }
}
