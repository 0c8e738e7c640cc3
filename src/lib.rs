pub mod config;
mod error;
pub mod events;
pub mod kit;
pub mod pattern;
pub mod sequencer;
pub mod timing;
pub mod transport;
mod ui;

pub use config::{MidiSettings, Settings};
pub use error::{Error, Result};
pub use events::{MidiEvent, ShortMessage};
pub use kit::{Instrument, Kit};
pub use pattern::Pattern;
pub use sequencer::{MidiSequencer, MidiSink, Sequencer, list_output_ports};
pub use timing::{Timeline, Track, build_track};
pub use transport::{PlaybackState, Transport};
pub use ui::{BeatBoxApp, WINDOW_TITLE};
