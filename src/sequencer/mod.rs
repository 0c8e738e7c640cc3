mod player;
mod sink;

pub use player::MidiSequencer;
pub use sink::{MidiSink, list_output_ports, open_output};

use crate::Result;
use crate::timing::Track;

/// A playback session: holds one track and loops it at a tempo.
///
/// The tempo is a base BPM multiplied by a separate scale factor.
pub trait Sequencer {
    /// Replaces the current track and rewinds to tick 0.
    fn set_track(&mut self, track: Track) -> Result<()>;

    fn set_loop_continuously(&mut self, enabled: bool) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    fn set_tempo_in_bpm(&mut self, bpm: f32) -> Result<()>;

    fn tempo_in_bpm(&self) -> f32;

    fn set_tempo_factor(&mut self, factor: f32) -> Result<()>;

    fn tempo_factor(&self) -> f32;

    /// Tick currently being played.
    fn tick_position(&self) -> u64;
}
