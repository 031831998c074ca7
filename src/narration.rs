//! Narration file loading
//!
//! Stands in for the synthesis pipeline's delivery step: the playback engine
//! itself never touches the filesystem, it only receives decoded samples.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tourcast_audio::{AudioSource, NARRATION_SAMPLE_RATE};

/// Load a narration file as a mono `AudioSource`.
///
/// With `raw`, the file is headerless little-endian 16-bit mono PCM at 24 kHz
/// (the synthesis pipeline's wire format); otherwise it is parsed as WAV and
/// mixed down to mono.
pub fn load(path: &Path, raw: bool) -> Result<AudioSource> {
    if raw {
        let bytes = fs::read(path).context("failed to read PCM file")?;
        Ok(AudioSource::from_pcm16(&bytes, NARRATION_SAMPLE_RATE))
    } else {
        load_wav(path)
    }
}

fn load_wav(path: &Path) -> Result<AudioSource> {
    let mut reader = hound::WavReader::open(path).context("failed to open WAV file")?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to read float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to read integer samples")?
        }
    };

    let mono = mix_down(&samples, spec.channels);
    Ok(AudioSource::from_samples(mono, spec.sample_rate))
}

/// Average interleaved channels into mono.
fn mix_down(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_down_averages_stereo_frames() {
        let mono = mix_down(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mix_down_passes_mono_through() {
        let mono = mix_down(&[0.1, 0.2], 1);
        assert_eq!(mono, vec![0.1, 0.2]);
    }
}
