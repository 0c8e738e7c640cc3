use std::time::Duration;

use super::Track;
use crate::events::MidiEvent;

/// A track laid out for playback: events sorted by tick, ready to be walked
/// one tick at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: Vec<MidiEvent>,
    end_tick: u64,
}

impl Timeline {
    /// Tracks are built row by row, so the events are sorted here. The sort
    /// is stable: events sharing a tick keep their insertion order.
    pub fn from_track(track: &Track) -> Self {
        let mut events = track.events().to_vec();
        events.sort_by_key(|e| e.tick);
        Self {
            events,
            end_tick: track.length_ticks(),
        }
    }

    pub fn end_tick(&self) -> u64 {
        self.end_tick
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn events_at(&self, tick: u64) -> &[MidiEvent] {
        let start = self.events.partition_point(|e| e.tick < tick);
        let end = self.events.partition_point(|e| e.tick <= tick);
        &self.events[start..end]
    }
}

/// Wall-clock length of one tick, or `None` when the tempo cannot advance
/// playback (zero, negative, or too small to represent).
pub fn tick_duration(bpm: f32, factor: f32, ppq: u16) -> Option<Duration> {
    let ticks_per_minute = bpm as f64 * factor as f64 * ppq as f64;
    if !ticks_per_minute.is_finite() || ticks_per_minute <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(60.0 / ticks_per_minute).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NOTE_ON, ShortMessage};
    use crate::kit::Kit;
    use crate::pattern::Pattern;
    use crate::timing::{DEFAULT_VELOCITY, PPQ, build_track};

    #[test]
    fn test_timeline_is_tick_sorted() {
        let mut pattern = Pattern::new();
        pattern.set(0, 9, true);
        pattern.set(5, 2, true);
        let track = build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY);

        let timeline = Timeline::from_track(&track);
        let ticks: Vec<u64> = timeline.events().iter().map(|e| e.tick).collect();
        let mut sorted = ticks.clone();
        sorted.sort();
        assert_eq!(ticks, sorted);
        assert_eq!(timeline.events().len(), track.len());
        assert_eq!(timeline.end_tick(), 16);
    }

    #[test]
    fn test_events_at_keeps_insertion_order() {
        let mut pattern = Pattern::new();
        pattern.set(4, 0, true);
        pattern.set(1, 0, true);
        let track = build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY);
        let timeline = Timeline::from_track(&track);

        let keys: Vec<u8> = timeline
            .events_at(0)
            .iter()
            .filter(|e| e.message.command() == NOTE_ON)
            .map(|e| e.message.data1())
            .collect();
        assert_eq!(keys, vec![42, 49]);
        assert!(timeline.events_at(7).is_empty());
        assert_eq!(timeline.events_at(16).len(), 16);
    }

    #[test]
    fn test_end_tick_of_hand_built_track() {
        let mut track = Track::new(PPQ);
        track.add(Some(MidiEvent::new(
            ShortMessage::note_on(9, 35, 100).unwrap(),
            3,
        )));
        assert_eq!(Timeline::from_track(&track).end_tick(), 3);
    }

    #[test]
    fn test_tick_duration_at_base_tempo() {
        let d = tick_duration(120.0, 1.0, PPQ).unwrap();
        assert_eq!(d, Duration::from_millis(125));
    }

    #[test]
    fn test_tick_duration_scales_with_factor() {
        let d = tick_duration(120.0, 2.0, PPQ).unwrap();
        assert!((d.as_secs_f64() - 0.0625).abs() < 1e-9);
    }

    #[test]
    fn test_tick_duration_stalls_on_degenerate_tempo() {
        assert!(tick_duration(120.0, 0.0, PPQ).is_none());
        assert!(tick_duration(-1.0, 1.0, PPQ).is_none());
        assert!(tick_duration(f32::NAN, 1.0, PPQ).is_none());
        assert!(tick_duration(120.0, f32::MIN_POSITIVE, PPQ).is_none());
    }
}
