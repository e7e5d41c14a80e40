//! Per-frame low-level descriptors computed with the `aus` analysis stack.

use anyhow::Result;
use aus::analysis;
use aus::analysis::mel::MelFilterbank;
use aus::spectrum;
use aus::WindowType;
use ndarray::{Array1, Array2};

const WINDOW_MS: usize = 25;
const HOP_MS: usize = 10;
const F0_MIN: f64 = 55.0;
const F0_MAX: f64 = 1000.0;

const MEL_BANDS: usize = 26;
const MIN_FREQ: f64 = 20.0;
const EPSILON: f64 = 1e-12;

/// Number of cepstral coefficients carried into the functionals (MFCC 1-4).
pub(crate) const MFCC_COUNT: usize = 4;

/// Low-level descriptor tracks for one audio segment.
///
/// The pitch track and the spectral tracks use the same window length but
/// are framed independently, so their lengths may differ by a frame or two;
/// functionals are computed per track and never require alignment.
pub(crate) struct LldTracks {
    pub f0_hz: Vec<f64>,
    pub voiced: Vec<bool>,
    pub energy: Array1<f64>,
    pub flux: Array1<f64>,
    pub centroid: Array1<f64>,
    pub slope: Array1<f64>,
    /// frames x MFCC_COUNT, c0 excluded
    pub mfcc: Array2<f64>,
}

impl LldTracks {
    fn empty() -> Self {
        Self {
            f0_hz: Vec::new(),
            voiced: Vec::new(),
            energy: Array1::zeros(0),
            flux: Array1::zeros(0),
            centroid: Array1::zeros(0),
            slope: Array1::zeros(0),
            mfcc: Array2::zeros((0, MFCC_COUNT)),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.energy.len()
    }
}

pub(crate) fn compute_lld(samples: &[f32], sample_rate: u32) -> Result<LldTracks> {
    let fft_size = ((sample_rate as usize * WINDOW_MS) / 1000).max(1);
    let hop_size = ((sample_rate as usize * HOP_MS) / 1000).max(1);
    if samples.len() < fft_size {
        // Too short to frame; the caller emits a defaulted feature row.
        return Ok(LldTracks::empty());
    }

    let audio_f64: Vec<f64> = samples.iter().map(|&s| s as f64).collect();

    let stft = spectrum::rstft(&audio_f64, fft_size, hop_size, WindowType::Hanning);
    let (magnitude, _) = spectrum::complex_to_polar_rstft(&stft);
    let power = analysis::make_power_spectrogram(&magnitude);
    let freqs = spectrum::rfftfreq(fft_size, sample_rate);

    let energy = compute_energy(&power);
    let flux = compute_spectral_flux(&magnitude);
    let centroid = compute_spectral_centroid(&magnitude, &freqs);
    let slope = compute_spectral_slope(&magnitude, &freqs);

    let filterbank = MelFilterbank::new(
        MIN_FREQ,
        (sample_rate as f64) / 2.0,
        MEL_BANDS,
        &freqs,
        true,
    );
    let mel = analysis::mel::make_mel_spectrogram(&power, &filterbank);
    // Request one extra coefficient so c0 can be dropped.
    let mfcc_raw = analysis::mel::mfcc_spectrogram(&mel, MFCC_COUNT + 1, None);
    let mfcc = strip_c0(&mfcc_raw);

    let (f0_hz, voiced) = compute_pitch_track(&audio_f64, sample_rate, fft_size);

    Ok(LldTracks {
        f0_hz,
        voiced,
        energy,
        flux,
        centroid,
        slope,
        mfcc,
    })
}

fn compute_energy(power: &[Vec<f64>]) -> Array1<f64> {
    let mut energies = Vec::with_capacity(power.len());
    for frame in power {
        let sum: f64 = frame.iter().sum();
        energies.push(sum.sqrt());
    }
    Array1::from_vec(energies)
}

fn compute_spectral_flux(magnitude: &[Vec<f64>]) -> Array1<f64> {
    if magnitude.is_empty() {
        return Array1::zeros(0);
    }
    let mut flux = Vec::with_capacity(magnitude.len());
    flux.push(0.0);
    for i in 1..magnitude.len() {
        let previous = &magnitude[i - 1];
        let current = &magnitude[i];
        let mut sum = 0.0;
        for (curr, prev) in current.iter().zip(previous.iter()) {
            let diff = (curr - prev).max(0.0);
            sum += diff * diff;
        }
        flux.push(sum.sqrt());
    }
    Array1::from_vec(flux)
}

fn compute_spectral_centroid(magnitude: &[Vec<f64>], freqs: &[f64]) -> Array1<f64> {
    let mut centroids = Vec::with_capacity(magnitude.len());
    for frame in magnitude {
        let total: f64 = frame.iter().sum();
        if total <= EPSILON {
            centroids.push(0.0);
            continue;
        }
        let weighted: f64 = frame
            .iter()
            .zip(freqs.iter())
            .map(|(mag, freq)| mag * freq)
            .sum();
        centroids.push(weighted / total);
    }
    Array1::from_vec(centroids)
}

/// Least-squares slope of the dB magnitude spectrum against frequency,
/// one value per frame (dB/Hz).
fn compute_spectral_slope(magnitude: &[Vec<f64>], freqs: &[f64]) -> Array1<f64> {
    let n = freqs.len() as f64;
    let freq_mean: f64 = freqs.iter().sum::<f64>() / n.max(1.0);
    let freq_var: f64 = freqs.iter().map(|f| (f - freq_mean).powi(2)).sum();

    let mut slopes = Vec::with_capacity(magnitude.len());
    for frame in magnitude {
        if freq_var <= EPSILON {
            slopes.push(0.0);
            continue;
        }
        let db: Vec<f64> = frame.iter().map(|m| 20.0 * (m + EPSILON).log10()).collect();
        let db_mean: f64 = db.iter().sum::<f64>() / n.max(1.0);
        let covariance: f64 = freqs
            .iter()
            .zip(db.iter())
            .map(|(f, d)| (f - freq_mean) * (d - db_mean))
            .sum();
        slopes.push(covariance / freq_var);
    }
    Array1::from_vec(slopes)
}

fn strip_c0(mfcc_raw: &[Vec<f64>]) -> Array2<f64> {
    if mfcc_raw.is_empty() {
        return Array2::zeros((0, MFCC_COUNT));
    }
    let mut matrix = Array2::zeros((mfcc_raw.len(), MFCC_COUNT));
    for (frame_idx, frame) in mfcc_raw.iter().enumerate() {
        for coeff in 0..MFCC_COUNT {
            matrix[[frame_idx, coeff]] = frame.get(coeff + 1).copied().unwrap_or(0.0);
        }
    }
    matrix
}

fn compute_pitch_track(
    audio: &[f64],
    sample_rate: u32,
    frame_len: usize,
) -> (Vec<f64>, Vec<bool>) {
    let (_timestamps, pitches, voiced_flags, _confidence) =
        analysis::pyin_pitch_estimator(audio, sample_rate, F0_MIN, F0_MAX, frame_len);
    (pitches, voiced_flags)
}
