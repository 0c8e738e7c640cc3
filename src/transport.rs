use crate::Result;
use crate::kit::Kit;
use crate::pattern::Pattern;
use crate::sequencer::Sequencer;
use crate::timing::{DEFAULT_VELOCITY, Track, build_track};

pub const BASE_BPM: f32 = 120.0;
pub const TEMPO_UP: f64 = 1.03;
pub const TEMPO_DOWN: f64 = 0.97;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// The four drum machine actions on top of a sequencer session.
///
/// The session is optional: when it could not be opened every action is
/// reported and ignored, so the rest of the program keeps working.
pub struct Transport<S: Sequencer> {
    session: Option<S>,
    kit: Kit,
    velocity: u8,
    state: PlaybackState,
}

impl<S: Sequencer> Transport<S> {
    pub fn new(session: Option<S>, kit: Kit) -> Self {
        Self {
            session,
            kit,
            velocity: DEFAULT_VELOCITY,
            state: PlaybackState::Stopped,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// Rebuilds the track from `pattern` and (re)starts looping it.
    ///
    /// Resets the tempo to 120 BPM with a factor of 1.0, discarding any
    /// Tempo Up/Down adjustments.
    pub fn start(&mut self, pattern: &Pattern) {
        let track = build_track(pattern, &self.kit, self.velocity);
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("Start ignored: no MIDI session");
            return;
        };

        match start_session(session, track) {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                tracing::info!(active = pattern.active_count(), "Playback started");
            }
            Err(e) => {
                tracing::error!("Failed to start playback: {}", e);
                self.state = if session.is_running() {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Stopped
                };
            }
        }
    }

    pub fn stop(&mut self) {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("Stop ignored: no MIDI session");
            return;
        };
        if let Err(e) = session.stop() {
            tracing::error!("Failed to stop playback: {}", e);
        }
        self.state = PlaybackState::Stopped;
        tracing::info!("Playback stopped");
    }

    pub fn tempo_up(&mut self) {
        self.scale_tempo(TEMPO_UP);
    }

    pub fn tempo_down(&mut self) {
        self.scale_tempo(TEMPO_DOWN);
    }

    /// No clamping: repeated presses drift without bound.
    fn scale_tempo(&mut self, multiplier: f64) {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("Tempo change ignored: no MIDI session");
            return;
        };
        let factor = (session.tempo_factor() as f64 * multiplier) as f32;
        match session.set_tempo_factor(factor) {
            Ok(()) => tracing::debug!(factor, "Tempo factor changed"),
            Err(e) => tracing::error!("Failed to change tempo: {}", e),
        }
    }

    pub fn tempo_in_bpm(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.tempo_in_bpm())
    }

    pub fn tempo_factor(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.tempo_factor())
    }

    pub fn effective_bpm(&self) -> Option<f32> {
        self.session
            .as_ref()
            .map(|s| s.tempo_in_bpm() * s.tempo_factor())
    }

    pub fn position(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.tick_position())
    }
}

fn start_session<S: Sequencer>(session: &mut S, track: Track) -> Result<()> {
    session.set_track(track)?;
    session.set_loop_continuously(true)?;
    session.start()?;
    session.set_tempo_in_bpm(BASE_BPM)?;
    session.set_tempo_factor(1.0)?;
    Ok(())
}
