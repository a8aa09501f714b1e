//! Shared short-time Fourier transform.
//!
//! Every descriptor works from the same power spectrogram, computed once per
//! extraction call: Hann-windowed frames of [`N_FFT`] samples, hop [`HOP`],
//! centered on their timestamps via reflection padding.

use std::f64::consts::PI;

use realfft::RealFftPlanner;

/// FFT window length in samples.
pub const N_FFT: usize = 2048;

/// Hop between consecutive analysis frames, in samples.
pub const HOP: usize = 512;

/// Power spectrogram of a mono clip.
///
/// `power[t][k]` is `|X_t[k]|^2` for frame `t` and FFT bin `k`,
/// with `k` in `0..=N_FFT/2`.
pub struct Spectrogram {
    pub power: Vec<Vec<f64>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.power.len()
    }

    pub fn num_bins(&self) -> usize {
        N_FFT / 2 + 1
    }

    /// Center frequency of FFT bin `k` in Hz.
    pub fn bin_hz(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / N_FFT as f64
    }
}

/// Computes the power spectrogram of a mono signal.
///
/// Frames are centered: the signal is reflection-padded by `N_FFT / 2` on
/// both sides, so a clip of `n` samples yields `1 + n / HOP` frames and even
/// very short clips produce at least one frame.
pub fn power_spectrogram(samples: &[f32], sample_rate: u32) -> Spectrogram {
    // An empty clip degenerates to a single silent frame, keeping descriptor
    // widths intact.
    if samples.is_empty() {
        return Spectrogram {
            power: vec![vec![0.0; N_FFT / 2 + 1]],
            sample_rate,
        };
    }

    let half = N_FFT / 2;
    let num_frames = 1 + samples.len() / HOP;
    let window = hann_window(N_FFT);

    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let mut frame_buf = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let mut power = Vec::with_capacity(num_frames);
    for f in 0..num_frames {
        let start = f as isize * HOP as isize - half as isize;
        for (i, v) in frame_buf.iter_mut().enumerate() {
            let idx = reflect_index(start + i as isize, samples.len());
            *v = samples[idx] as f64 * window[i];
        }

        // Lengths come from the planner, so the transform cannot fail.
        fft.process(&mut frame_buf, &mut spectrum).unwrap();

        let frame: Vec<f64> = spectrum.iter().map(|c| c.norm_sqr()).collect();
        power.push(frame);
    }

    Spectrogram { power, sample_rate }
}

/// Periodic Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Maps an out-of-range index back into `0..len` by reflecting at the
/// boundaries without repeating the edge samples.
fn reflect_index(idx: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = idx.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}
