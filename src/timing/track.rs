use crate::events::{
    CONTROL_CHANGE, MidiEvent, NOTE_OFF, NOTE_ON, PERCUSSION_CHANNEL, PROGRAM_CHANGE,
    ShortMessage,
};
use crate::kit::Kit;
use crate::pattern::{Pattern, STEP_COUNT};

/// Ticks per quarter note. One step is one tick, so a measure of 16 steps
/// spans four beats.
pub const PPQ: u16 = 4;

pub const DEFAULT_VELOCITY: u8 = 100;

/// Marker closing each instrument row: channel 1, data 127/0, at tick 16.
const ROW_MARKER: (u8, u8, u8, u8) = (CONTROL_CHANGE, 1, 127, 0);
const ROW_MARKER_TICK: u64 = STEP_COUNT as u64;

/// Trailing program change on the percussion channel, at tick 15.
const TRAILER: (u8, u8, u8, u8) = (PROGRAM_CHANGE, PERCUSSION_CHANNEL, 1, 0);
const TRAILER_TICK: u64 = STEP_COUNT as u64 - 1;

/// Events in the order they were added, which is not necessarily tick order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub ppq: u16,
    events: Vec<MidiEvent>,
}

impl Track {
    pub fn new(ppq: u16) -> Self {
        Self {
            ppq,
            events: Vec::new(),
        }
    }

    pub fn add(&mut self, event: Option<MidiEvent>) {
        if let Some(event) = event {
            self.events.push(event);
        }
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn length_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.tick).max().unwrap_or(0)
    }
}

/// Builds the percussion track for a pattern, row by row.
///
/// For every active cell a note-on is placed at the step's tick and a
/// note-off one tick later. Each row is closed by a marker event and the
/// track ends with a fixed program change. Events that fail validation are
/// logged and left out.
pub fn build_track(pattern: &Pattern, kit: &Kit, velocity: u8) -> Track {
    let mut track = Track::new(PPQ);

    for (row, instrument) in pattern.rows().zip(kit.iter()) {
        for (step, &active) in row.iter().enumerate() {
            if !active {
                continue;
            }
            let tick = step as u64;
            let key = instrument.key;
            track.add(make_event(NOTE_ON, PERCUSSION_CHANNEL, key, velocity, tick));
            track.add(make_event(NOTE_OFF, PERCUSSION_CHANNEL, key, velocity, tick + 1));
        }

        let (command, channel, data1, data2) = ROW_MARKER;
        track.add(make_event(command, channel, data1, data2, ROW_MARKER_TICK));
    }

    let (command, channel, data1, data2) = TRAILER;
    track.add(make_event(command, channel, data1, data2, TRAILER_TICK));

    tracing::debug!(
        events = track.len(),
        active = pattern.active_count(),
        "Built track"
    );
    track
}

pub fn make_event(
    command: u8,
    channel: u8,
    data1: u8,
    data2: u8,
    tick: u64,
) -> Option<MidiEvent> {
    match ShortMessage::new(command, channel, data1, data2) {
        Ok(message) => Some(MidiEvent::new(message, tick)),
        Err(e) => {
            tracing::warn!(tick, "Dropping event: {}", e);
            None
        }
    }
}
