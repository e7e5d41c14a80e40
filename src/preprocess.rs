//! Partition preprocessor: walks a cohort's raw recordings and persists one
//! feature table per (recording, window configuration).
//!
//! Failure policy is per-file skip-and-continue for the expected misses
//! (absent audio, absent segmentation); anything else aborts the partition.

use anyhow::Result;

use crate::audio::decoder;
use crate::extract;
use crate::features::FunctionalsExtractor;
use crate::store::DataStore;
use crate::types::{LabelRecord, Partition, WindowConfig};

/// Window configurations to process. A single configuration is used in
/// practice; the values end up in feature filenames only.
pub const WINDOW_CONFIGS: &[WindowConfig] = &[WindowConfig {
    n_fft: 2048,
    hop_length: 512,
}];

/// Outcome counts for one partition run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Process every `.wav` in the partition's audio directory for every window
/// configuration, writing one feature CSV per pair and a labels CSV for the
/// partition.
pub fn preprocess_partition(store: &DataStore, partition: Partition) -> Result<PartitionSummary> {
    println!("Processing partition: {}", partition);

    let extractor = FunctionalsExtractor::new();
    let audio_files = store.list_audio_files(partition)?;
    let mut summary = PartitionSummary::default();
    let mut labels: Vec<LabelRecord> = Vec::new();

    for (window_idx, window) in WINDOW_CONFIGS.iter().enumerate() {
        for (file_idx, filename) in audio_files.iter().enumerate() {
            println!(
                "  [{}/{}] {} (window {}x{})",
                file_idx + 1,
                audio_files.len(),
                filename,
                window.n_fft,
                window.hop_length
            );

            let Some((audio_path, label)) = store.resolve_audio(partition, filename) else {
                summary.skipped += 1;
                continue;
            };
            let base_name = base_name(filename);
            let Some(segments) = store.load_segmentation(partition, base_name)? else {
                summary.skipped += 1;
                continue;
            };

            let participant = extract::participant_segments(&segments);
            let audio = decoder::decode_audio(&audio_path)?;
            let mut table =
                extract::extract_segment_features(&audio, &participant, &extractor, *window)?;
            table.attach_label(label);
            store.save_features(partition, base_name, &table, *window)?;

            if window_idx == 0 {
                labels.push(LabelRecord {
                    file: filename.clone(),
                    label: label.to_string(),
                });
            }
            summary.processed += 1;
        }
    }

    store.save_labels(partition, &labels)?;
    Ok(summary)
}

/// Strip the audio extension to get the base name shared with the
/// segmentation and feature files.
fn base_name(filename: &str) -> &str {
    std::path::Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
}
