//! Chromagram: 12-bin pitch-class energy.
//!
//! Each FFT bin is assigned to the pitch class of its nearest equal-tempered
//! semitone (A440 reference) and the power spectrogram is folded accordingly.
//! Frames are normalized to a peak of 1 so loudness does not dominate pitch
//! content.

use crate::mel;
use crate::stft::Spectrogram;

/// Number of pitch classes in the descriptor output.
pub const NUM_BINS: usize = 12;

const A440: f64 = 440.0;
/// MIDI note number of A440; pitch class C is note 0 mod 12.
const A440_NOTE: f64 = 69.0;

/// Per-frame chromagram of a power spectrogram, `[frame][pitch_class]`.
pub(crate) fn chroma_frames(power: &[Vec<f64>], sample_rate: u32) -> Vec<Vec<f64>> {
    let num_bins = power.first().map_or(0, Vec::len);
    let classes = bin_pitch_classes(num_bins, sample_rate);

    power
        .iter()
        .map(|frame| {
            let mut chroma = vec![0.0f64; NUM_BINS];
            for (k, &p) in frame.iter().enumerate() {
                if let Some(c) = classes[k] {
                    chroma[c] += p;
                }
            }
            let peak = chroma.iter().cloned().fold(0.0f64, f64::max);
            if peak > 0.0 {
                for v in &mut chroma {
                    *v /= peak;
                }
            }
            chroma
        })
        .collect()
}

/// Time-mean of the chromagram: the `chroma` descriptor block.
pub fn chroma_mean(spec: &Spectrogram) -> Vec<f32> {
    mel::time_mean(&chroma_frames(&spec.power, spec.sample_rate))
}

/// Pitch class of each FFT bin; `None` for the DC bin, which has no pitch.
fn bin_pitch_classes(num_bins: usize, sample_rate: u32) -> Vec<Option<usize>> {
    let bin_hz = sample_rate as f64 / crate::stft::N_FFT as f64;
    (0..num_bins)
        .map(|k| {
            if k == 0 {
                return None;
            }
            let hz = k as f64 * bin_hz;
            let note = A440_NOTE + 12.0 * (hz / A440).log2();
            let class = (note.round() as i64).rem_euclid(12) as usize;
            Some(class)
        })
        .collect()
}
