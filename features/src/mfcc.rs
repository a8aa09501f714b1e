//! Mel-frequency cepstral coefficients.
//!
//! Computed from the mel power spectrogram: convert to decibels, apply an
//! orthonormal DCT-II along the band axis, keep the first [`NUM_COEFFS`]
//! coefficients per frame.

use std::f64::consts::PI;

use crate::mel::{self, NUM_BANDS};
use crate::stft::Spectrogram;

/// Number of cepstral coefficients in the descriptor output.
pub const NUM_COEFFS: usize = 40;

const POWER_FLOOR: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Time-mean of the per-frame MFCCs: the `mfcc` descriptor block.
pub fn mfcc_mean(spec: &Spectrogram) -> Vec<f32> {
    let mut mel_spec = mel::mel_spectrogram(spec);
    power_to_db(&mut mel_spec);

    let basis = dct_basis(NUM_COEFFS, NUM_BANDS);
    let coeffs: Vec<Vec<f64>> = mel_spec
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame).map(|(b, v)| b * v).sum())
                .collect()
        })
        .collect();

    mel::time_mean(&coeffs)
}

/// Converts power values to decibels in place, floored at [`POWER_FLOOR`]
/// and clamped to [`TOP_DB`] below the spectrogram-wide maximum.
fn power_to_db(frames: &mut [Vec<f64>]) {
    let mut max_db = f64::MIN;
    for frame in frames.iter_mut() {
        for v in frame.iter_mut() {
            *v = 10.0 * v.max(POWER_FLOOR).log10();
            if *v > max_db {
                max_db = *v;
            }
        }
    }
    let floor_db = max_db - TOP_DB;
    for frame in frames.iter_mut() {
        for v in frame.iter_mut() {
            if *v < floor_db {
                *v = floor_db;
            }
        }
    }
}

/// Orthonormal DCT-II basis, `[coeff][band]`.
fn dct_basis(num_coeffs: usize, num_bands: usize) -> Vec<Vec<f64>> {
    let m = num_bands as f64;
    (0..num_coeffs)
        .map(|n| {
            let scale = if n == 0 {
                (1.0 / m).sqrt()
            } else {
                (2.0 / m).sqrt()
            };
            (0..num_bands)
                .map(|k| scale * (PI * n as f64 * (k as f64 + 0.5) / m).cos())
                .collect()
        })
        .collect()
}
