//! Spectral contrast: peak-to-valley energy spread per sub-band.
//!
//! The spectrum is split into a residual low band below 200 Hz plus six
//! octave-wide bands above it. For each band and frame the contrast is the
//! decibel difference between the mean of the strongest and weakest 2 % of
//! bin energies.

use crate::mel;
use crate::stft::Spectrogram;

/// Number of sub-bands in the descriptor output (residual low band + 6 octaves).
pub const NUM_BANDS: usize = 7;

const FMIN: f64 = 200.0;
const QUANTILE: f64 = 0.02;
const POWER_FLOOR: f64 = 1e-10;

/// Time-mean of the per-frame spectral contrast: the `contrast` descriptor block.
pub fn contrast_mean(spec: &Spectrogram) -> Vec<f32> {
    let bands = band_bins(spec);
    let frames: Vec<Vec<f64>> = spec
        .power
        .iter()
        .map(|frame| {
            bands
                .iter()
                .map(|&(lo, hi)| band_contrast(&frame[lo..hi]))
                .collect()
        })
        .collect();
    mel::time_mean(&frames)
}

/// Decibel spread between the top and bottom [`QUANTILE`] of a band's bins.
fn band_contrast(band: &[f64]) -> f64 {
    if band.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = band.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let take = ((QUANTILE * band.len() as f64).round() as usize).max(1);
    let valley: f64 = sorted[..take].iter().sum::<f64>() / take as f64;
    let peak: f64 = sorted[sorted.len() - take..].iter().sum::<f64>() / take as f64;

    10.0 * (peak.max(POWER_FLOOR).log10() - valley.max(POWER_FLOOR).log10())
}

/// Half-open FFT-bin ranges `[lo, hi)` for each sub-band.
///
/// Fences sit at 200 Hz doublings; the top band runs to Nyquist.
fn band_bins(spec: &Spectrogram) -> Vec<(usize, usize)> {
    let num_bins = spec.num_bins();
    let bin_of = |hz: f64| -> usize {
        let mut k = 0;
        while k < num_bins && spec.bin_hz(k) < hz {
            k += 1;
        }
        k
    };

    let mut bands = Vec::with_capacity(NUM_BANDS);
    let mut lo = 0usize;
    for b in 0..NUM_BANDS {
        let hi = if b == NUM_BANDS - 1 {
            num_bins
        } else {
            bin_of(FMIN * f64::powi(2.0, b as i32)).max(lo + 1).min(num_bins)
        };
        bands.push((lo, hi));
        lo = hi;
    }
    bands
}
