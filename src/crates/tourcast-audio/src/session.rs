//! Capability seam between the playback state machine and the audio device
//!
//! The player only ever talks to these traits, so the state machine can be
//! exercised against a manually advanced fake clock in tests while the real
//! deployment plugs in the cpal-backed session from [`crate::engine`].

use crate::{AudioSource, Result};

/// Outcome of stopping a scheduled source.
///
/// The device may have invalidated the handle on its own (natural end racing
/// an explicit stop). That is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyReleased,
}

/// A one-shot handle to a buffer scheduled for playback from a start offset.
///
/// Invalidated by stopping it or by the buffer playing out; a handle is never
/// rescheduled.
pub trait ScheduledSource {
    /// Stop playback and release the underlying device resources.
    fn stop(&mut self) -> ReleaseOutcome;
}

/// A live connection to the audio output device, providing the monotonic
/// clock all elapsed-time arithmetic derives from.
pub trait ClockSession {
    type Source: ScheduledSource;

    /// Current device clock reading in seconds. Monotonic for the lifetime
    /// of the session, including across pause cycles.
    fn now(&self) -> f64;

    /// Bring a suspended device connection back to a running state.
    fn resume(&mut self) -> Result<()>;

    /// Schedule `source` to play starting `offset` seconds in, replacing any
    /// source previously scheduled on this session.
    fn schedule(&mut self, source: &AudioSource, offset: f64) -> Result<Self::Source>;

    /// Disconnect from the device. The session is unusable afterwards.
    fn close(&mut self);
}

/// Opens device sessions on demand, so the player can defer acquisition to
/// the first play.
pub trait AudioBackend {
    type Session: ClockSession;

    fn create_session(&mut self) -> Result<Self::Session>;
}
