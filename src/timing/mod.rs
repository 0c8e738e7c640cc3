mod scheduler;
mod track;

pub use scheduler::{Timeline, tick_duration};
pub use track::{DEFAULT_VELOCITY, PPQ, Track, build_track, make_event};
