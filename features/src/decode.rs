//! Audio container decoding.
//!
//! Decodes an uploaded clip (WAV, MP3, FLAC, M4A) into mono f32 samples via
//! symphonia, then resamples to [`ANALYSIS_RATE`] so every descriptor computed
//! in the same call sees the same rate.

use std::fs::File;
use std::path::Path;

use rubato::{FftFixedInOut, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::FeatureError;

/// Sample rate every clip is analyzed at, in Hz.
pub const ANALYSIS_RATE: u32 = 22_050;

/// A decoded clip: mono samples at [`DecodedAudio::sample_rate`].
///
/// Owned exclusively by the extraction call that decoded it; never persisted.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Clip duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes an audio file into mono samples at [`ANALYSIS_RATE`].
///
/// Stereo and multi-channel content is downmixed by channel averaging.
/// Returns [`FeatureError::Decode`] if the file cannot be parsed as audio.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, FeatureError> {
    let file = File::open(path)
        .map_err(|e| FeatureError::Decode(format!("cannot open {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FeatureError::Decode(format!("unrecognized audio format: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| FeatureError::Decode("no audio track found".into()))?;

    let source_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| FeatureError::Decode(format!("unsupported codec: {e}")))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("packet read error, stopping decode: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                warn!("skipping undecodable packet: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        if sample_buf.is_none() || num_frames > buf_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            buf_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks(channels) {
            let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
            samples.push(mono);
        }
    }

    if samples.is_empty() {
        return Err(FeatureError::Decode(format!(
            "no audio samples in {}",
            path.display()
        )));
    }

    debug!(
        "decoded {} samples @ {source_rate}Hz from {}",
        samples.len(),
        path.display()
    );

    let samples = resample(samples, source_rate, ANALYSIS_RATE)?;
    Ok(DecodedAudio {
        samples,
        sample_rate: ANALYSIS_RATE,
    })
}

/// Converts mono samples between sample rates with rubato's FFT resampler.
/// The final partial chunk is zero-padded and the output trimmed to the
/// rate-scaled length, so repeated calls on the same input are identical.
fn resample(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, FeatureError> {
    if from == to {
        return Ok(samples);
    }

    let mut resampler = FftFixedInOut::<f32>::new(from as usize, to as usize, 1024, 1)
        .map_err(|e| FeatureError::Resample(e.to_string()))?;

    let target_len = (samples.len() as u64 * to as u64 / from as u64) as usize;
    let chunk = resampler.input_frames_next();
    let mut input = vec![vec![0.0f32; chunk]];
    let mut out: Vec<f32> = Vec::with_capacity(target_len + chunk);

    let mut pos = 0;
    while pos < samples.len() {
        let n = chunk.min(samples.len() - pos);
        input[0][..n].copy_from_slice(&samples[pos..pos + n]);
        input[0][n..].fill(0.0);
        let frames = resampler
            .process(&input, None)
            .map_err(|e| FeatureError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += n;
    }

    out.truncate(target_len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::io::Write;

    /// Builds a minimal PCM16 mono WAV file in memory.
    fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn sine_samples(freq_hz: f64, n: usize, sample_rate: u32) -> Vec<i16> {
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (16000.0 * (freq_hz * 2.0 * PI * t).sin()) as i16
            })
            .collect()
    }

    fn write_temp_wav(samples: &[i16], sample_rate: u32) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .unwrap();
        f.write_all(&wav_bytes(samples, sample_rate)).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn decode_wav_at_analysis_rate() {
        let samples = sine_samples(440.0, 22_050, 22_050);
        let f = write_temp_wav(&samples, 22_050);
        let audio = decode_file(f.path()).unwrap();
        assert_eq!(audio.sample_rate, ANALYSIS_RATE);
        assert_eq!(audio.samples.len(), 22_050);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decode_wav_resamples_to_analysis_rate() {
        let samples = sine_samples(440.0, 44_100, 44_100);
        let f = write_temp_wav(&samples, 44_100);
        let audio = decode_file(f.path()).unwrap();
        assert_eq!(audio.sample_rate, ANALYSIS_RATE);
        // 1 second of audio regardless of source rate.
        assert_eq!(audio.samples.len(), 22_050);
    }

    #[test]
    fn decode_garbage_fails() {
        let mut f = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .unwrap();
        f.write_all(b"this is not audio at all").unwrap();
        f.flush().unwrap();
        let err = decode_file(f.path()).unwrap_err();
        assert!(matches!(err, FeatureError::Decode(_)));
    }

    #[test]
    fn decode_missing_file_fails() {
        let err = decode_file(Path::new("/nonexistent/clip.wav")).unwrap_err();
        assert!(matches!(err, FeatureError::Decode(_)));
    }

    #[test]
    fn resample_identity() {
        let samples = vec![0.5f32; 4096];
        let out = resample(samples.clone(), 22_050, 22_050).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_halves_length() {
        let samples = vec![0.25f32; 44_100];
        let out = resample(samples, 44_100, 22_050).unwrap();
        assert_eq!(out.len(), 22_050);
    }

    #[test]
    fn resample_deterministic() {
        let samples: Vec<f32> = (0..32_000)
            .map(|i| ((i as f64) * 0.01).sin() as f32)
            .collect();
        let a = resample(samples.clone(), 16_000, 22_050).unwrap();
        let b = resample(samples, 16_000, 22_050).unwrap();
        assert_eq!(a, b);
    }
}
