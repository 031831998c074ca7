//! Playback state machine for a single narration track
//!
//! The player owns the device session, the accumulated offset arithmetic,
//! and the progress loop. All mutation happens on the caller's thread; the
//! only cross-thread state is inside the session implementation.

use serde::Serialize;
use tracing::debug;

use crate::engine::CpalBackend;
use crate::sampler::{ProgressSampler, Tick};
use crate::session::{AudioBackend, ClockSession, ReleaseOutcome, ScheduledSource};
use crate::{AudioSource, Result};

/// Where the player is in a track's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Ended,
}

/// Snapshot of the observable playback fields, refreshed each poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
}

/// Live device resources for one playback session.
///
/// Exists from the first play until teardown; pause keeps it alive so clock
/// readings stay comparable across the gap.
struct PlaybackSession<S: ClockSession> {
    clock: S,
    scheduled: Option<S::Source>,
    /// Clock reading when the current segment was scheduled
    started_at: f64,
    /// Seconds of the track consumed before the current segment;
    /// always within [0, duration]
    consumed: f64,
}

impl<S: ClockSession> PlaybackSession<S> {
    fn new(clock: S) -> Self {
        PlaybackSession {
            clock,
            scheduled: None,
            started_at: 0.0,
            consumed: 0.0,
        }
    }

    fn release_scheduled(&mut self, context: &str) {
        if let Some(mut scheduled) = self.scheduled.take() {
            if let ReleaseOutcome::AlreadyReleased = scheduled.stop() {
                debug!("scheduled source already released {context}");
            }
        }
    }
}

/// Plays one narration track against a device clock.
pub struct Player<B: AudioBackend> {
    backend: B,
    source: Option<AudioSource>,
    state: PlaybackState,
    session: Option<PlaybackSession<B::Session>>,
    sampler: ProgressSampler,
    current_time: f64,
}

impl Player<CpalBackend> {
    /// Player over the default output device. The device is not touched
    /// until the first play.
    pub fn new(source: Option<AudioSource>) -> Self {
        Self::with_backend(CpalBackend, source)
    }
}

impl<B: AudioBackend> Player<B> {
    pub fn with_backend(backend: B, source: Option<AudioSource>) -> Self {
        Player {
            backend,
            source,
            state: PlaybackState::Idle,
            session: None,
            sampler: ProgressSampler::new(),
            current_time: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.source.as_ref().map(AudioSource::duration).unwrap_or(0.0)
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            is_playing: self.is_playing(),
            current_time: self.current_time,
            duration: self.duration(),
        }
    }

    /// Pause when playing, otherwise start. A track that already ran to its
    /// end restarts from zero.
    pub fn toggle(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            if self.current_time >= self.duration() {
                if let Some(session) = &mut self.session {
                    session.consumed = 0.0;
                }
                self.current_time = 0.0;
            }
            self.play()
        }
    }

    /// Schedule the track from the accumulated offset, opening the device
    /// session first if this is the first play. No track, or already
    /// playing, is a no-op.
    pub fn play(&mut self) -> Result<()> {
        let Some(source) = self.source.clone() else {
            return Ok(());
        };
        if self.state == PlaybackState::Playing {
            return Ok(());
        }

        if self.session.is_none() {
            let clock = self.backend.create_session()?;
            self.session = Some(PlaybackSession::new(clock));
        }
        if let Some(session) = &mut self.session {
            session.clock.resume()?;

            // A stale offset at or past the end restarts the track.
            if session.consumed >= source.duration() {
                session.consumed = 0.0;
            }
            let scheduled = session.clock.schedule(&source, session.consumed)?;
            session.started_at = session.clock.now();
            session.scheduled = Some(scheduled);

            self.state = PlaybackState::Playing;
            self.sampler.arm();
        }
        Ok(())
    }

    /// Stop the scheduled source, bank the elapsed time into the accumulated
    /// offset, and cancel the tick chain. The device session stays open.
    pub fn pause(&mut self) {
        let duration = self.duration();
        let Some(session) = &mut self.session else {
            return;
        };
        session.release_scheduled("on pause");
        self.sampler.disarm();
        let elapsed = session.clock.now() - session.started_at;
        session.consumed = (session.consumed + elapsed).min(duration);
        self.state = PlaybackState::Paused;
    }

    /// Advance the progress loop one tick; drive this on the host's
    /// rendering cadence. A no-op unless a tick chain is armed.
    pub fn poll(&mut self) -> PlaybackStatus {
        let duration = self.duration();
        if let Some(session) = &mut self.session {
            let elapsed = session.clock.now() - session.started_at + session.consumed;
            match self.sampler.sample(elapsed, duration) {
                Tick::Idle => {}
                Tick::Progress(position) => self.current_time = position,
                Tick::Finished => {
                    session.release_scheduled("at end of track");
                    session.consumed = 0.0;
                    self.current_time = duration;
                    self.state = PlaybackState::Ended;
                }
            }
        }
        self.status()
    }

    /// Tear down every playback resource: the scheduled source, the pending
    /// tick chain, and the device session. Safe to call repeatedly or when
    /// nothing was ever started.
    pub fn cleanup(&mut self) {
        self.sampler.disarm();
        if let Some(mut session) = self.session.take() {
            session.release_scheduled("on cleanup");
            session.clock.close();
        }
        self.state = PlaybackState::Idle;
    }
}
