//! cpal-backed device session
//!
//! One output stream per session. The stream runs for the whole session
//! lifetime and renders silence when nothing is scheduled, so the session
//! clock keeps advancing across pauses exactly like a hardware clock. The
//! clock itself counts frames delivered to the device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use tracing::error;

use crate::session::{AudioBackend, ClockSession, ReleaseOutcome, ScheduledSource};
use crate::{AudioError, AudioSource, Result};

/// Opens [`CpalSession`]s on the default output device.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    type Session = CpalSession;

    fn create_session(&mut self) -> Result<CpalSession> {
        CpalSession::open()
    }
}

/// Playhead over a scheduled narration buffer.
///
/// Advances by the source/output rate ratio with linear interpolation, so
/// 24 kHz narration plays correctly on a 44.1 or 48 kHz device.
struct Voice {
    id: u64,
    source: AudioSource,
    /// Fractional frame position in the source
    position: f64,
    active: bool,
}

impl Voice {
    fn new(id: u64, source: AudioSource, offset: f64) -> Self {
        let position = offset * source.sample_rate() as f64;
        Voice {
            id,
            source,
            position,
            active: true,
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    /// Next mono sample, or `None` once the buffer is exhausted.
    fn next_sample(&mut self, output_rate: u32) -> Option<f32> {
        if !self.active {
            return None;
        }
        if self.position >= self.source.frames() as f64 {
            self.active = false;
            return None;
        }
        let value = self.interpolate();
        self.position += self.source.sample_rate() as f64 / output_rate as f64;
        Some(value)
    }

    fn interpolate(&self) -> f32 {
        let data = self.source.samples();
        let base = self.position.floor() as usize;
        if base >= data.len() {
            return 0.0;
        }
        let current = data[base];
        let Some(&next) = data.get(base + 1) else {
            return current;
        };
        let fraction = (self.position - self.position.floor()) as f32;
        current + (next - current) * fraction
    }
}

/// State shared between the session handle and the stream callback.
struct Shared {
    /// Frames delivered to the device since the session opened
    frames: AtomicU64,
    /// The single scheduled voice, if any
    slot: Mutex<Option<Voice>>,
}

/// A live connection to the default output device.
pub struct CpalSession {
    stream: Option<Stream>,
    shared: Arc<Shared>,
    output_rate: u32,
    next_id: u64,
}

impl CpalSession {
    fn open() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceError("no output device available".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceError(format!("failed to get default config: {e}")))?;

        let sample_format = config.sample_format();
        let output_rate = config.sample_rate().0;
        let config: StreamConfig = config.into();

        let shared = Arc::new(Shared {
            frames: AtomicU64::new(0),
            slot: Mutex::new(None),
        });

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, Arc::clone(&shared), output_rate)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, Arc::clone(&shared), output_rate)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, Arc::clone(&shared), output_rate)?
            }
            format => {
                return Err(AudioError::DeviceError(format!(
                    "unsupported sample format: {format:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("failed to start stream: {e}")))?;

        Ok(CpalSession {
            stream: Some(stream),
            shared,
            output_rate,
            next_id: 0,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        shared: Arc<Shared>,
        output_rate: u32,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut slot = shared.slot.lock();
                    for frame in data.chunks_mut(channels) {
                        let value: f32 = slot
                            .as_mut()
                            .and_then(|voice| voice.next_sample(output_rate))
                            .unwrap_or(0.0);
                        for sample in frame.iter_mut() {
                            *sample = T::from_sample(value);
                        }
                    }
                    // A voice that played out releases its slot, so stale
                    // handles observe AlreadyReleased.
                    if slot.as_ref().is_some_and(|voice| !voice.is_active()) {
                        *slot = None;
                    }
                    shared
                        .frames
                        .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("failed to build output stream: {e}")))
    }
}

impl ClockSession for CpalSession {
    type Source = CpalScheduledSource;

    fn now(&self) -> f64 {
        self.shared.frames.load(Ordering::Relaxed) as f64 / self.output_rate as f64
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamError(format!("failed to resume stream: {e}")))?;
        }
        Ok(())
    }

    fn schedule(&mut self, source: &AudioSource, offset: f64) -> Result<CpalScheduledSource> {
        self.next_id += 1;
        let id = self.next_id;
        *self.shared.slot.lock() = Some(Voice::new(id, source.clone(), offset));
        Ok(CpalScheduledSource {
            shared: Arc::clone(&self.shared),
            id,
        })
    }

    fn close(&mut self) {
        *self.shared.slot.lock() = None;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                error!("failed to stop stream on close: {e}");
            }
        }
    }
}

/// One-shot handle to the voice created by a [`CpalSession::schedule`] call.
pub struct CpalScheduledSource {
    shared: Arc<Shared>,
    id: u64,
}

impl ScheduledSource for CpalScheduledSource {
    fn stop(&mut self) -> ReleaseOutcome {
        let mut slot = self.shared.slot.lock();
        match slot.as_ref() {
            Some(voice) if voice.id == self.id => {
                *slot = None;
                ReleaseOutcome::Released
            }
            _ => ReleaseOutcome::AlreadyReleased,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn voice_interpolates_between_frames() {
        // Source at half the output rate: the playhead advances by half a
        // frame per output sample.
        let source = AudioSource::from_samples(vec![0.0, 0.2, 0.4], 4);
        let mut voice = Voice::new(1, source, 0.0);

        let expected = [0.0, 0.1, 0.2, 0.3, 0.4, 0.4];
        for value in expected {
            assert_close(voice.next_sample(8).unwrap(), value);
        }
        assert!(voice.next_sample(8).is_none());
        assert!(!voice.is_active());
    }

    #[test]
    fn voice_starts_at_offset() {
        let source = AudioSource::from_samples(vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7], 4);
        let mut voice = Voice::new(1, source, 1.0);
        assert_close(voice.next_sample(4).unwrap(), 0.4);
    }

    #[test]
    fn voice_past_the_end_is_immediately_inactive() {
        let source = AudioSource::from_samples(vec![0.0, 0.1], 4);
        let mut voice = Voice::new(1, source, 10.0);
        assert!(voice.next_sample(4).is_none());
        assert!(!voice.is_active());
    }

    #[test]
    fn empty_voice_never_produces_samples() {
        let source = AudioSource::from_samples(Vec::new(), 4);
        let mut voice = Voice::new(1, source, 0.0);
        assert!(voice.next_sample(4).is_none());
    }

    #[test]
    fn stale_handle_reports_already_released() {
        let shared = Arc::new(Shared {
            frames: AtomicU64::new(0),
            slot: Mutex::new(None),
        });
        let source = AudioSource::from_samples(vec![0.0; 8], 4);

        *shared.slot.lock() = Some(Voice::new(1, source.clone(), 0.0));
        let mut first = CpalScheduledSource {
            shared: Arc::clone(&shared),
            id: 1,
        };

        // A second schedule replaces the slot; the first handle is now stale.
        *shared.slot.lock() = Some(Voice::new(2, source, 0.0));
        let mut second = CpalScheduledSource {
            shared: Arc::clone(&shared),
            id: 2,
        };

        assert_eq!(first.stop(), ReleaseOutcome::AlreadyReleased);
        assert!(shared.slot.lock().is_some(), "stale stop must not kill the live voice");

        assert_eq!(second.stop(), ReleaseOutcome::Released);
        assert_eq!(second.stop(), ReleaseOutcome::AlreadyReleased);
        assert!(shared.slot.lock().is_none());
    }

    #[test]
    fn open_does_not_panic_without_a_device() {
        // Succeeds or returns DeviceError depending on the host; never panics.
        let _ = CpalSession::open();
    }
}
