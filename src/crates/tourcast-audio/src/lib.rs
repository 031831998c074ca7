//! Narration playback engine for Tourcast audio guides
//!
//! This crate turns a decoded narration buffer (immutable PCM samples plus a
//! sample rate) into accurately timed, pausable playback synchronized against
//! the audio device clock:
//! - Lazily open one device session per track and reuse it across pauses
//! - Schedule one-shot sources with manual offset arithmetic
//! - Publish progress from a cooperative polling loop
//! - Release every acquired device resource on every exit path

pub mod engine;
pub mod player;
pub mod sampler;
pub mod session;
pub mod source;

pub use engine::{CpalBackend, CpalScheduledSource, CpalSession};
pub use player::{PlaybackState, PlaybackStatus, Player};
pub use sampler::{ProgressSampler, Tick};
pub use session::{AudioBackend, ClockSession, ReleaseOutcome, ScheduledSource};
pub use source::{AudioSource, NARRATION_SAMPLE_RATE};

/// Audio playback errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
