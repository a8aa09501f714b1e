//! Tonnetz: 6-dimensional tonal centroid features.
//!
//! The harmonic component of the spectrogram is isolated with a
//! median-filtering harmonic/percussive separation, folded into a chromagram,
//! and projected onto interval circles (fifths, minor thirds, major thirds),
//! each contributing a sine/cosine coordinate pair.

use std::f64::consts::PI;

use crate::chroma::{self, NUM_BINS};
use crate::mel;
use crate::stft::Spectrogram;

/// Dimensionality of the tonal centroid output.
pub const NUM_DIMS: usize = 6;

/// Median filter length for the harmonic/percussive split.
const HPSS_KERNEL: usize = 31;
const EPS: f64 = 1e-10;

/// Time-mean of the tonal centroid trajectory: the `tonnetz` descriptor block.
pub fn tonnetz_mean(spec: &Spectrogram) -> Vec<f32> {
    let harmonic = harmonic_power(&spec.power);
    let mut chroma = chroma::chroma_frames(&harmonic, spec.sample_rate);

    // Tonal centroids expect an L1-normalized chroma distribution per frame.
    for frame in &mut chroma {
        let sum: f64 = frame.iter().sum();
        if sum > 0.0 {
            for v in frame.iter_mut() {
                *v /= sum;
            }
        }
    }

    let basis = centroid_basis();
    let frames: Vec<Vec<f64>> = chroma
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame).map(|(b, c)| b * c).sum())
                .collect()
        })
        .collect();
    mel::time_mean(&frames)
}

/// Harmonic part of a power spectrogram.
///
/// Harmonic energy is steady across time, percussive energy across frequency;
/// two median filters estimate each and a soft Wiener mask keeps the part of
/// every bin that the harmonic estimate explains.
fn harmonic_power(power: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let num_frames = power.len();
    let num_bins = power.first().map_or(0, Vec::len);
    let half = HPSS_KERNEL / 2;

    let mut result = vec![vec![0.0f64; num_bins]; num_frames];
    let mut window = Vec::with_capacity(HPSS_KERNEL);

    for t in 0..num_frames {
        let t_lo = t.saturating_sub(half);
        let t_hi = (t + half + 1).min(num_frames);
        for k in 0..num_bins {
            // Median across time at fixed frequency: harmonic estimate.
            window.clear();
            window.extend((t_lo..t_hi).map(|i| power[i][k]));
            let harm = median(&mut window);

            // Median across frequency at fixed time: percussive estimate.
            let k_lo = k.saturating_sub(half);
            let k_hi = (k + half + 1).min(num_bins);
            window.clear();
            window.extend_from_slice(&power[t][k_lo..k_hi]);
            let perc = median(&mut window);

            let mask = (harm * harm) / (harm * harm + perc * perc + EPS);
            result[t][k] = power[t][k] * mask;
        }
    }
    result
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values[values.len() / 2]
}

/// Interval-circle projection basis, `[dim][pitch_class]`.
///
/// Rows come in sine/cosine pairs for the circles of fifths (7 semitones),
/// minor thirds (3) and major thirds (4); the major-third circle carries
/// half weight.
fn centroid_basis() -> Vec<Vec<f64>> {
    let circles: [(f64, f64); 3] = [
        (7.0 * PI / 6.0, 1.0),
        (3.0 * PI / 2.0, 1.0),
        (2.0 * PI / 3.0, 0.5),
    ];

    let mut basis = Vec::with_capacity(NUM_DIMS);
    for &(step, radius) in &circles {
        let sin_row: Vec<f64> = (0..NUM_BINS).map(|c| radius * (c as f64 * step).sin()).collect();
        let cos_row: Vec<f64> = (0..NUM_BINS).map(|c| radius * (c as f64 * step).cos()).collect();
        basis.push(sin_row);
        basis.push(cos_row);
    }
    basis
}
