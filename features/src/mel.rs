//! Mel-scaled spectrogram.
//!
//! Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalized triangular filters spanning 0 Hz to Nyquist.

use crate::stft::{Spectrogram, N_FFT};

/// Number of mel bands in the descriptor output.
pub const NUM_BANDS: usize = 128;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn hz_to_mel(hz: f64) -> f64 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / LOG_STEP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (LOG_STEP * (mel - MIN_LOG_MEL)).exp()
    }
}

/// Log frequency step per mel above the 1 kHz break: ln(6.4) / 27.
const LOG_STEP: f64 = 0.06875177742094912;

/// Triangular mel filterbank, `[band][fft_bin]` weights.
///
/// Each triangle spans three consecutive mel-spaced corner frequencies and is
/// scaled by `2 / (upper - lower)` so that filters carry equal area.
pub fn mel_filterbank(num_bands: usize, sample_rate: u32) -> Vec<Vec<f64>> {
    let num_bins = N_FFT / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let mel_max = hz_to_mel(nyquist);
    let corners: Vec<f64> = (0..num_bands + 2)
        .map(|i| mel_to_hz(i as f64 * mel_max / (num_bands + 1) as f64))
        .collect();

    let mut fb = Vec::with_capacity(num_bands);
    for m in 0..num_bands {
        let (lower, center, upper) = (corners[m], corners[m + 1], corners[m + 2]);
        let enorm = 2.0 / (upper - lower);
        let mut filter = vec![0.0f64; num_bins];
        for (k, w) in filter.iter_mut().enumerate() {
            let hz = k as f64 * sample_rate as f64 / N_FFT as f64;
            let rising = (hz - lower) / (center - lower);
            let falling = (upper - hz) / (upper - center);
            *w = rising.min(falling).max(0.0) * enorm;
        }
        fb.push(filter);
    }
    fb
}

/// Mel power spectrogram, `[frame][band]`.
pub fn mel_spectrogram(spec: &Spectrogram) -> Vec<Vec<f64>> {
    let fb = mel_filterbank(NUM_BANDS, spec.sample_rate);
    spec.power
        .iter()
        .map(|frame| {
            fb.iter()
                .map(|filter| filter.iter().zip(frame).map(|(w, p)| w * p).sum())
                .collect()
        })
        .collect()
}

/// Time-mean of the mel power spectrogram: the `mel` descriptor block.
pub fn mel_mean(spec: &Spectrogram) -> Vec<f32> {
    time_mean(&mel_spectrogram(spec))
}

/// Column-wise mean over frames, narrowed to f32 for the feature vector.
pub(crate) fn time_mean(frames: &[Vec<f64>]) -> Vec<f32> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let t = frames.len() as f64;
    let mut mean = vec![0.0f64; first.len()];
    for frame in frames {
        for (acc, v) in mean.iter_mut().zip(frame) {
            *acc += v;
        }
    }
    mean.into_iter().map(|v| (v / t) as f32).collect()
}
