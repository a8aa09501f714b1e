//! Acoustic feature extraction for voice gender classification.
//!
//! # Pipeline
//!
//! 1. [`decode_file`]: audio container (WAV, MP3, FLAC, M4A) -> mono f32
//!    samples at [`ANALYSIS_RATE`]
//! 2. [`extract`]: decoded clip + [`FeatureSelection`] -> flat f32 vector
//!
//! Five descriptor blocks can be enabled independently; each is computed over
//! the full clip and reduced to its time-mean. Enabled blocks are
//! concatenated in a fixed order:
//!
//! | block    | width |
//! |----------|-------|
//! | mfcc     | 40    |
//! | chroma   | 12    |
//! | mel      | 128   |
//! | contrast | 7     |
//! | tonnetz  | 6     |
//!
//! Extraction is a pure function of the file contents and the selection:
//! no shared state, identical output on repeated calls, safe to run
//! concurrently across requests.

mod chroma;
mod contrast;
mod decode;
mod error;
mod mel;
mod mfcc;
mod stft;
mod tonnetz;

use std::path::Path;

pub use decode::{decode_file, DecodedAudio, ANALYSIS_RATE};
pub use error::FeatureError;

/// Independently selectable descriptor blocks.
///
/// At least one block must be enabled for a non-empty vector; the production
/// configuration is [`FeatureSelection::mel_only`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSelection {
    pub mfcc: bool,
    pub chroma: bool,
    pub mel: bool,
    pub contrast: bool,
    pub tonnetz: bool,
}

impl FeatureSelection {
    /// The production selection: the 128-band mel block only.
    pub fn mel_only() -> Self {
        Self {
            mel: true,
            ..Self::default()
        }
    }

    /// Every descriptor block enabled.
    pub fn all() -> Self {
        Self {
            mfcc: true,
            chroma: true,
            mel: true,
            contrast: true,
            tonnetz: true,
        }
    }

    /// True when no block is enabled.
    pub fn is_empty(&self) -> bool {
        !(self.mfcc || self.chroma || self.mel || self.contrast || self.tonnetz)
    }

    /// Width of the vector this selection produces.
    pub fn width(&self) -> usize {
        let mut w = 0;
        if self.mfcc {
            w += mfcc::NUM_COEFFS;
        }
        if self.chroma {
            w += chroma::NUM_BINS;
        }
        if self.mel {
            w += mel::NUM_BANDS;
        }
        if self.contrast {
            w += contrast::NUM_BANDS;
        }
        if self.tonnetz {
            w += tonnetz::NUM_DIMS;
        }
        w
    }
}

/// Decodes an audio file and extracts the selected descriptor blocks.
///
/// Returns [`FeatureError::EmptySelection`] when no block is enabled and
/// [`FeatureError::Decode`] when the file cannot be parsed as audio.
pub fn extract(path: &Path, selection: &FeatureSelection) -> Result<Vec<f32>, FeatureError> {
    if selection.is_empty() {
        return Err(FeatureError::EmptySelection);
    }
    let audio = decode_file(path)?;
    Ok(extract_from_audio(&audio, selection))
}

/// Extracts the selected descriptor blocks from an already decoded clip.
///
/// The shared power spectrogram is computed once and reused by every enabled
/// block. An empty selection yields an empty vector.
pub fn extract_from_audio(audio: &DecodedAudio, selection: &FeatureSelection) -> Vec<f32> {
    let spec = stft::power_spectrogram(&audio.samples, audio.sample_rate);

    let mut out = Vec::with_capacity(selection.width());
    if selection.mfcc {
        out.extend(mfcc::mfcc_mean(&spec));
    }
    if selection.chroma {
        out.extend(chroma::chroma_mean(&spec));
    }
    if selection.mel {
        out.extend(mel::mel_mean(&spec));
    }
    if selection.contrast {
        out.extend(contrast::contrast_mean(&spec));
    }
    if selection.tonnetz {
        out.extend(tonnetz::tonnetz_mean(&spec));
    }
    out
}
