//! Core types for the cohort speech feature pipeline

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Cohort split: Alzheimer's Disease or Cognitively Normal.
///
/// The mapping is binary with a non-"ad" default branch: any value other
/// than "ad" resolves to the control cohort. This mirrors the layout of the
/// source corpus, where only two directories exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Ad,
    Cn,
}

impl Partition {
    /// Both partitions, in processing order.
    pub const ALL: [Partition; 2] = [Partition::Ad, Partition::Cn];

    /// Directory name under `data/raw/audio` and `data/processed/features`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Ad => "ad",
            Partition::Cn => "cn",
        }
    }

    /// Diagnosis label attached to every feature row of this partition.
    pub fn label(&self) -> &'static str {
        match self {
            Partition::Ad => "AD",
            Partition::Cn => "CN",
        }
    }
}

impl FromStr for Partition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "ad" {
            Ok(Partition::Ad)
        } else {
            Ok(Partition::Cn)
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// STFT window parameters carried through the pipeline.
///
/// Only used to disambiguate feature filenames; the extractor frames audio
/// with its own fixed windowing (see `features`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub n_fft: usize,
    pub hop_length: usize,
}

impl WindowConfig {
    /// The `{n_fft}_{hop_length}` fragment embedded in feature filenames.
    pub fn filename_fragment(&self) -> String {
        format!("{}_{}", self.n_fft, self.hop_length)
    }
}

/// One diarized speech turn from a segmentation table.
///
/// `begin`/`end` are seconds from the start of the recording. Extra CSV
/// columns beyond the minimum schema are ignored at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub speaker: String,
    pub begin: f64,
    pub end: f64,
}

/// Raw decoded audio (mono, f32 samples, native sample rate).
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// One (file, label) row of a partition labels table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub file: String,
    pub label: String,
}

/// In-memory feature table: one row per processed segment.
///
/// Columns are the extractor-defined feature names; `labels` stays empty
/// until a partition label is attached, after which it holds one value per
/// row and is persisted as a trailing `Label` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one feature row; the arity must match the column set.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "feature row has {} values but the table has {} columns",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    /// Attach the same label to every row, replacing any previous labels.
    pub fn attach_label(&mut self, label: &str) {
        self.labels = vec![label.to_string(); self.rows.len()];
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }
}
