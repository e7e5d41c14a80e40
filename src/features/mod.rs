//! Segment-level acoustic feature extraction.
//!
//! `FunctionalsExtractor` computes an eGeMAPS-style set of functionals —
//! summary statistics over per-frame low-level descriptors — for one audio
//! segment at its native sample rate. Framing is fixed at 25 ms windows
//! with a 10 ms hop regardless of the window configuration carried through
//! the pipeline for filename purposes.

mod functionals;
mod lld;

use anyhow::Result;

use functionals::{amean, percentile, stddev_norm};
use lld::{compute_lld, LldTracks, MFCC_COUNT};

/// Semitone reference for F0 conversion (A0, 27.5 Hz).
const SEMITONE_BASE_HZ: f64 = 27.5;

/// Column order of every feature row this extractor produces.
pub const FEATURE_NAMES: &[&str] = &[
    "f0_semitone_amean",
    "f0_semitone_stddev_norm",
    "f0_semitone_percentile20",
    "f0_semitone_percentile50",
    "f0_semitone_percentile80",
    "f0_semitone_pctl_range_20_80",
    "voiced_fraction",
    "voiced_segments_per_second",
    "energy_amean",
    "energy_stddev_norm",
    "energy_percentile20",
    "energy_percentile50",
    "energy_percentile80",
    "energy_pctl_range_20_80",
    "spectral_flux_amean",
    "spectral_flux_stddev_norm",
    "spectral_centroid_amean",
    "spectral_centroid_stddev_norm",
    "spectral_slope_amean",
    "spectral_slope_stddev_norm",
    "mfcc1_amean",
    "mfcc1_stddev_norm",
    "mfcc2_amean",
    "mfcc2_stddev_norm",
    "mfcc3_amean",
    "mfcc3_stddev_norm",
    "mfcc4_amean",
    "mfcc4_stddev_norm",
];

/// Responsible for turning one audio segment into one feature row.
#[derive(Debug, Default)]
pub struct FunctionalsExtractor {}

impl FunctionalsExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed column order matching every row `process` returns.
    pub fn feature_names(&self) -> &'static [&'static str] {
        FEATURE_NAMES
    }

    /// Extract the functionals row for one segment of mono audio.
    ///
    /// A segment shorter than one analysis frame yields an all-zero row so
    /// callers keep one output row per segmentation row.
    pub fn process(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>> {
        let tracks = compute_lld(samples, sample_rate)?;
        if tracks.frame_count() == 0 && tracks.f0_hz.is_empty() {
            return Ok(vec![0.0; FEATURE_NAMES.len()]);
        }
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Ok(assemble_row(&tracks, duration_secs))
    }
}

fn assemble_row(tracks: &LldTracks, duration_secs: f64) -> Vec<f64> {
    let mut row = Vec::with_capacity(FEATURE_NAMES.len());

    let f0_semitones = voiced_semitones(&tracks.f0_hz, &tracks.voiced);
    push_distribution(&mut row, &f0_semitones);

    row.push(voiced_fraction(&tracks.voiced));
    row.push(voiced_segments_per_second(&tracks.voiced, duration_secs));

    let energy = tracks.energy.to_vec();
    push_distribution(&mut row, &energy);

    push_spread(&mut row, &tracks.flux.to_vec());
    push_spread(&mut row, &tracks.centroid.to_vec());
    push_spread(&mut row, &tracks.slope.to_vec());

    for coeff in 0..MFCC_COUNT {
        let series: Vec<f64> = tracks.mfcc.column(coeff).to_vec();
        push_spread(&mut row, &series);
    }

    debug_assert_eq!(row.len(), FEATURE_NAMES.len());
    row
}

/// amean, normalized stddev, percentiles 20/50/80 and the 20-80 range.
fn push_distribution(row: &mut Vec<f64>, series: &[f64]) {
    let p20 = percentile(series, 20.0);
    let p80 = percentile(series, 80.0);
    row.push(amean(series));
    row.push(stddev_norm(series));
    row.push(p20);
    row.push(percentile(series, 50.0));
    row.push(p80);
    row.push(p80 - p20);
}

/// amean and normalized stddev only.
fn push_spread(row: &mut Vec<f64>, series: &[f64]) {
    row.push(amean(series));
    row.push(stddev_norm(series));
}

fn voiced_semitones(f0_hz: &[f64], voiced: &[bool]) -> Vec<f64> {
    f0_hz
        .iter()
        .zip(voiced.iter())
        .filter_map(|(&pitch, &flag)| {
            (flag && pitch.is_finite() && pitch > 0.0)
                .then(|| 12.0 * (pitch / SEMITONE_BASE_HZ).log2())
        })
        .collect()
}

fn voiced_fraction(voiced: &[bool]) -> f64 {
    if voiced.is_empty() {
        return 0.0;
    }
    voiced.iter().filter(|&&flag| flag).count() as f64 / voiced.len() as f64
}

/// Count of contiguous voiced runs, normalized by segment duration.
fn voiced_segments_per_second(voiced: &[bool], duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    let mut runs = 0usize;
    let mut previous = false;
    for &flag in voiced {
        if flag && !previous {
            runs += 1;
        }
        previous = flag;
    }
    runs as f64 / duration_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 16_000;

    fn sine_wave(frequency: f32, duration_secs: f32) -> Vec<f32> {
        let total = (SAMPLE_RATE as f32 * duration_secs) as usize;
        (0..total)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.6 * (2.0 * PI * frequency * t).sin()
            })
            .collect()
    }

    #[test]
    fn row_arity_matches_feature_names() {
        let extractor = FunctionalsExtractor::new();
        let row = extractor
            .process(&sine_wave(220.0, 0.5), SAMPLE_RATE)
            .unwrap();
        assert_eq!(row.len(), extractor.feature_names().len());
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn pure_tone_pitch_lands_near_true_frequency() {
        let extractor = FunctionalsExtractor::new();
        let row = extractor
            .process(&sine_wave(440.0, 1.0), SAMPLE_RATE)
            .unwrap();

        // 440 Hz is exactly 48 semitones above the 27.5 Hz reference.
        let f0_amean = row[0];
        assert_abs_diff_eq!(f0_amean, 48.0, epsilon = 1.0);

        let voiced = row[6];
        assert!(voiced > 0.5, "pure tone should be mostly voiced: {voiced}");
    }

    #[test]
    fn silence_yields_zero_pitch_and_energy() {
        let extractor = FunctionalsExtractor::new();
        let row = extractor.process(&vec![0.0; 8000], SAMPLE_RATE).unwrap();

        let voiced = row[6];
        let energy_amean = row[8];
        assert!(voiced < 0.2, "silence should be mostly unvoiced: {voiced}");
        assert_abs_diff_eq!(energy_amean, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn sub_frame_segment_yields_zero_row() {
        let extractor = FunctionalsExtractor::new();
        let row = extractor.process(&[0.1, -0.1, 0.05], SAMPLE_RATE).unwrap();
        assert_eq!(row, vec![0.0; FEATURE_NAMES.len()]);
    }

    #[test]
    fn louder_signal_has_higher_energy_mean() {
        let extractor = FunctionalsExtractor::new();
        let quiet: Vec<f32> = sine_wave(200.0, 0.5).iter().map(|s| s * 0.1).collect();
        let loud = sine_wave(200.0, 0.5);

        let quiet_row = extractor.process(&quiet, SAMPLE_RATE).unwrap();
        let loud_row = extractor.process(&loud, SAMPLE_RATE).unwrap();
        assert!(loud_row[8] > quiet_row[8]);
    }
}
