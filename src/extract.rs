//! Segment-bounded feature extraction.
//!
//! Takes a decoded recording plus a segmentation table already filtered to
//! the speaker of interest and produces one feature row per segment, in
//! table order.

use anyhow::{Context, Result};

use crate::audio::slicer;
use crate::features::FunctionalsExtractor;
use crate::types::{AudioData, FeatureTable, SegmentRecord, WindowConfig};

/// Diarization label of the study participant.
pub const PARTICIPANT_SPEAKER: &str = "PAR";

/// Keep only the participant's speech turns, preserving table order.
pub fn participant_segments(segments: &[SegmentRecord]) -> Vec<SegmentRecord> {
    segments
        .iter()
        .filter(|segment| segment.speaker == PARTICIPANT_SPEAKER)
        .cloned()
        .collect()
}

/// Extract one functionals row per segment of the recording.
///
/// An empty segmentation table yields an empty table with the extractor's
/// columns rather than an error. The window configuration only tags the
/// eventual output filename; framing stays under the extractor's control.
pub fn extract_segment_features(
    audio: &AudioData,
    segments: &[SegmentRecord],
    extractor: &FunctionalsExtractor,
    _window: WindowConfig,
) -> Result<FeatureTable> {
    let columns = extractor
        .feature_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut table = FeatureTable::new(columns);

    for (index, segment) in segments.iter().enumerate() {
        let samples = slicer::slice_segment(audio, segment.begin, segment.end);
        let row = extractor
            .process(&samples, audio.sample_rate)
            .with_context(|| {
                format!(
                    "failed to extract features for segment {} ({:.3}s - {:.3}s)",
                    index, segment.begin, segment.end
                )
            })?;
        table.push_row(row)?;
    }

    Ok(table)
}
