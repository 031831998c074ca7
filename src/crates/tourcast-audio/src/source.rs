//! Decoded narration audio handed over by the synthesis pipeline
//!
//! The engine never decodes or mutates audio; it plays exactly the samples
//! it was given.

use std::sync::Arc;

/// Sample rate the synthesis pipeline delivers narration at (mono).
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;

/// An immutable buffer of decoded mono PCM audio.
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// Mono samples, normalized to [-1.0, 1.0]
    data: Arc<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioSource {
    /// Wrap already-decoded mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        AudioSource {
            data: Arc::new(samples),
            sample_rate,
        }
    }

    /// Decode little-endian signed 16-bit PCM, the wire format narration
    /// arrives in. A trailing odd byte is ignored.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Self::from_samples(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (mono, so one sample per frame).
    pub fn frames(&self) -> usize {
        self.data.len()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_frame_count() {
        let source = AudioSource::from_samples(vec![0.0; 24_000], NARRATION_SAMPLE_RATE);
        assert_eq!(source.duration(), 1.0);
        assert_eq!(source.frames(), 24_000);
    }

    #[test]
    fn empty_source_has_zero_duration() {
        let source = AudioSource::from_samples(Vec::new(), NARRATION_SAMPLE_RATE);
        assert_eq!(source.duration(), 0.0);
    }

    #[test]
    fn pcm16_scales_to_unit_range() {
        let mut bytes = Vec::new();
        for value in [0i16, 16_384, -32_768] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let source = AudioSource::from_pcm16(&bytes, NARRATION_SAMPLE_RATE);
        assert_eq!(source.samples(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn pcm16_ignores_trailing_odd_byte() {
        let source = AudioSource::from_pcm16(&[0, 0, 7], NARRATION_SAMPLE_RATE);
        assert_eq!(source.frames(), 1);
    }
}
