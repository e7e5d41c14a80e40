use crate::types::AudioData;

/// Extract the [begin, end) second range of a decoded recording.
///
/// Boundaries are converted to sample indices and clamped to the available
/// audio, so a segment that runs past the end of the recording yields the
/// samples that exist rather than panicking.
pub fn slice_segment(audio: &AudioData, begin: f64, end: f64) -> Vec<f32> {
    let sr = audio.sample_rate as f64;
    let total = audio.samples.len();

    let start_sample = ((begin.max(0.0) * sr).floor() as usize).min(total);
    let end_sample = ((end.max(0.0) * sr).floor() as usize)
        .max(start_sample)
        .min(total);

    audio.samples[start_sample..end_sample].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(samples: usize, sample_rate: u32) -> AudioData {
        AudioData {
            samples: (0..samples).map(|i| i as f32).collect(),
            sample_rate,
        }
    }

    #[test]
    fn slices_expected_sample_range() {
        let audio = audio(1000, 1000);
        let segment = slice_segment(&audio, 0.25, 0.75);
        assert_eq!(segment.len(), 500);
        assert_eq!(segment[0], 250.0);
        assert_eq!(*segment.last().unwrap(), 749.0);
    }

    #[test]
    fn clamps_to_available_audio() {
        let audio = audio(1000, 1000);
        let segment = slice_segment(&audio, 0.5, 2.0);
        assert_eq!(segment.len(), 500);
    }

    #[test]
    fn inverted_or_out_of_range_bounds_yield_empty() {
        let audio = audio(1000, 1000);
        assert!(slice_segment(&audio, 0.75, 0.25).is_empty());
        assert!(slice_segment(&audio, 5.0, 6.0).is_empty());
    }
}
