use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};

use super::{MidiSink, Sequencer, open_output};
use crate::config::MidiSettings;
use crate::events::{NOTE_OFF, NOTE_ON, ShortMessage};
use crate::timing::{PPQ, Timeline, Track, tick_duration};
use crate::{Error, Result};

const DEFAULT_BPM: f32 = 120.0;

#[derive(Debug)]
enum PlayerCommand {
    Load { timeline: Timeline, ppq: u16 },
    SetLooping(bool),
    Start,
    Stop,
    SetTempo { bpm: f32, factor: f32 },
    Shutdown,
}

/// Sequencer session that plays tracks to a MIDI sink from its own thread.
///
/// All control goes through a command channel; the only shared state is the
/// tick counter and the running flag.
pub struct MidiSequencer {
    command_tx: Sender<PlayerCommand>,
    position: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    player: Option<JoinHandle<()>>,
    bpm: f32,
    factor: f32,
}

impl MidiSequencer {
    pub fn open(settings: &MidiSettings) -> Result<Self> {
        let connection = open_output(settings)?;
        Ok(Self::with_sink(connection))
    }

    pub fn with_sink(sink: impl MidiSink) -> Self {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();
        let position = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(false));

        let player_position = position.clone();
        let player_running = running.clone();
        let player = std::thread::spawn(move || {
            player_thread(command_rx, Box::new(sink), player_position, player_running);
        });

        Self {
            command_tx,
            position,
            running,
            player: Some(player),
            bpm: DEFAULT_BPM,
            factor: 1.0,
        }
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.command_tx.send(command).map_err(|_| Error::PlayerGone)
    }

    fn push_tempo(&self) -> Result<()> {
        self.send(PlayerCommand::SetTempo {
            bpm: self.bpm,
            factor: self.factor,
        })
    }
}

impl Sequencer for MidiSequencer {
    fn set_track(&mut self, track: Track) -> Result<()> {
        self.send(PlayerCommand::Load {
            timeline: Timeline::from_track(&track),
            ppq: track.ppq,
        })
    }

    fn set_loop_continuously(&mut self, enabled: bool) -> Result<()> {
        self.send(PlayerCommand::SetLooping(enabled))
    }

    fn start(&mut self) -> Result<()> {
        self.running.store(true, Ordering::Relaxed);
        self.send(PlayerCommand::Start).inspect_err(|_| {
            self.running.store(false, Ordering::Relaxed);
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Relaxed);
        self.send(PlayerCommand::Stop)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn set_tempo_in_bpm(&mut self, bpm: f32) -> Result<()> {
        self.bpm = bpm;
        self.push_tempo()
    }

    fn tempo_in_bpm(&self) -> f32 {
        self.bpm
    }

    fn set_tempo_factor(&mut self, factor: f32) -> Result<()> {
        self.factor = factor;
        self.push_tempo()
    }

    fn tempo_factor(&self) -> f32 {
        self.factor
    }

    fn tick_position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl Drop for MidiSequencer {
    fn drop(&mut self) {
        let _ = self.command_tx.send(PlayerCommand::Shutdown);
        if let Some(player) = self.player.take() {
            let _ = player.join();
        }
    }
}

struct PlayerState {
    sink: Box<dyn MidiSink>,
    timeline: Timeline,
    ppq: u16,
    looping: bool,
    playing: bool,
    tick: u64,
    bpm: f32,
    factor: f32,
    next_deadline: Option<Instant>,
    /// Start of the tick interval ending at `next_deadline`; `None` when the
    /// pending tick is due immediately.
    tick_started: Option<Instant>,
    sounding: Vec<(u8, u8)>,
    position: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

fn player_thread(
    command_rx: Receiver<PlayerCommand>,
    sink: Box<dyn MidiSink>,
    position: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) {
    let mut state = PlayerState {
        sink,
        timeline: Timeline::default(),
        ppq: PPQ,
        looping: false,
        playing: false,
        tick: 0,
        bpm: DEFAULT_BPM,
        factor: 1.0,
        next_deadline: None,
        tick_started: None,
        sounding: Vec::new(),
        position,
        running,
    };

    loop {
        let received = match state.next_deadline {
            Some(deadline) if state.playing => command_rx.recv_deadline(deadline),
            _ => command_rx.recv().map_err(RecvTimeoutError::from),
        };

        match received {
            Ok(PlayerCommand::Shutdown) => {
                state.silence();
                break;
            }
            Ok(command) => state.apply(command),
            Err(RecvTimeoutError::Timeout) => state.advance(),
            Err(RecvTimeoutError::Disconnected) => {
                state.silence();
                break;
            }
        }
    }

    tracing::debug!("Sequencer player stopped");
}

impl PlayerState {
    fn apply(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Load { timeline, ppq } => {
                self.silence();
                tracing::debug!(
                    events = timeline.events().len(),
                    end_tick = timeline.end_tick(),
                    "Track loaded"
                );
                self.timeline = timeline;
                self.ppq = ppq;
                self.rewind();
            }
            PlayerCommand::SetLooping(enabled) => {
                self.looping = enabled;
            }
            PlayerCommand::Start => {
                if !self.playing {
                    self.playing = true;
                    self.next_deadline = Some(Instant::now());
                    self.tick_started = None;
                }
            }
            PlayerCommand::Stop => {
                self.playing = false;
                self.next_deadline = None;
                self.tick_started = None;
                self.silence();
            }
            PlayerCommand::SetTempo { bpm, factor } => {
                self.bpm = bpm;
                self.factor = factor;
                if self.playing {
                    self.reschedule();
                }
            }
            PlayerCommand::Shutdown => {}
        }
    }

    /// Plays everything due at the current tick and schedules the next one.
    fn advance(&mut self) {
        let Some(deadline) = self.next_deadline else {
            return;
        };

        self.position.store(self.tick, Ordering::Relaxed);
        let due: Vec<ShortMessage> = self
            .timeline
            .events_at(self.tick)
            .iter()
            .map(|e| e.message)
            .collect();
        for message in due {
            self.dispatch(message);
        }

        let end_tick = self.timeline.end_tick();
        if self.tick >= end_tick {
            if !self.looping {
                self.playing = false;
                self.running.store(false, Ordering::Relaxed);
                self.next_deadline = None;
                self.tick_started = None;
                self.silence();
                self.rewind();
                tracing::debug!("Reached end of track");
                return;
            }
            self.tick = 0;
            // Tick 0 of the next pass coincides with the loop end.
            if end_tick > 0 {
                self.tick_started = None;
                return;
            }
        } else {
            self.tick += 1;
        }

        self.tick_started = Some(deadline);
        self.reschedule();
    }

    /// Re-times the pending tick from when it started, at the current tempo.
    /// A deadline already in the past fires on the next loop iteration.
    fn reschedule(&mut self) {
        let Some(started) = self.tick_started else {
            return;
        };
        self.next_deadline = self.tick_length().and_then(|d| started.checked_add(d));
        if self.next_deadline.is_none() {
            tracing::warn!(bpm = self.bpm, factor = self.factor, "Tempo too low, playback stalled");
        }
    }

    fn tick_length(&self) -> Option<Duration> {
        tick_duration(self.bpm, self.factor, self.ppq)
    }

    fn rewind(&mut self) {
        self.tick = 0;
        self.tick_started = None;
        self.position.store(0, Ordering::Relaxed);
        if self.playing {
            self.next_deadline = Some(Instant::now());
        }
    }

    fn dispatch(&mut self, message: ShortMessage) {
        let note = (message.channel(), message.data1());
        match message.command() {
            NOTE_ON if message.data2() > 0 => {
                if !self.sounding.contains(&note) {
                    self.sounding.push(note);
                }
            }
            NOTE_ON | NOTE_OFF => self.sounding.retain(|n| *n != note),
            _ => {}
        }

        if let Err(e) = self.sink.send(&message.bytes()) {
            tracing::warn!("MIDI send failed: {}", e);
        }
    }

    /// Releases every note still held.
    fn silence(&mut self) {
        for (channel, key) in std::mem::take(&mut self.sounding) {
            match ShortMessage::note_off(channel, key, 0) {
                Ok(message) => {
                    if let Err(e) = self.sink.send(&message.bytes()) {
                        tracing::warn!("MIDI send failed: {}", e);
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::Kit;
    use crate::pattern::Pattern;
    use crate::timing::{DEFAULT_VELOCITY, build_track};

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_sequencer() -> (MidiSequencer, Receiver<Vec<u8>>) {
        let (tx, rx) = crossbeam::channel::unbounded::<Vec<u8>>();
        let mut sequencer = MidiSequencer::with_sink(tx);
        sequencer.set_tempo_factor(10.0).unwrap();
        (sequencer, rx)
    }

    #[test]
    fn test_plays_in_tick_order() {
        let (mut sequencer, rx) = fast_sequencer();
        let mut pattern = Pattern::new();
        pattern.set(0, 2, true);
        pattern.set(1, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        sequencer.start().unwrap();

        let received: Vec<Vec<u8>> = (0..4).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(
            received,
            vec![
                vec![0x99, 42, 100],
                vec![0x89, 42, 100],
                vec![0x99, 35, 100],
                vec![0x89, 35, 100],
            ]
        );
    }

    #[test]
    fn test_loops_back_to_start() {
        let (mut sequencer, rx) = fast_sequencer();
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        sequencer.set_loop_continuously(true).unwrap();
        sequencer.start().unwrap();

        let note_ons = std::iter::from_fn(|| rx.recv_timeout(WAIT).ok())
            .filter(|m| m[0] == 0x99)
            .take(2)
            .count();
        assert_eq!(note_ons, 2);
    }

    #[test]
    fn test_without_looping_plays_once() {
        let (mut sequencer, rx) = fast_sequencer();
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        sequencer.start().unwrap();

        // note on, note off, program change, 16 row markers
        let messages: Vec<Vec<u8>> = (0..19).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(messages[2], vec![0xC9, 1]);
        assert!(messages[3..].iter().all(|m| m == &vec![0xB1, 127, 0]));
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_stop_releases_held_notes() {
        let (tx, rx) = crossbeam::channel::unbounded::<Vec<u8>>();
        let mut sequencer = MidiSequencer::with_sink(tx);
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        // Stalled tempo: only tick 0 plays, the note stays held.
        sequencer.set_tempo_factor(0.0).unwrap();
        sequencer.start().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x99, 35, 100]);

        sequencer.stop().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x89, 35, 0]);
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_tempo_is_tracked_locally() {
        let (tx, _rx) = crossbeam::channel::unbounded::<Vec<u8>>();
        let mut sequencer = MidiSequencer::with_sink(tx);
        assert_eq!(sequencer.tempo_in_bpm(), 120.0);
        sequencer.set_tempo_in_bpm(90.0).unwrap();
        sequencer.set_tempo_factor(0.5).unwrap();
        assert_eq!(sequencer.tempo_in_bpm(), 90.0);
        assert_eq!(sequencer.tempo_factor(), 0.5);
    }

    #[test]
    fn test_tempo_change_retimes_pending_tick() {
        let (tx, rx) = crossbeam::channel::unbounded::<Vec<u8>>();
        let mut sequencer = MidiSequencer::with_sink(tx);
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        // One tick lasts about two minutes at this factor.
        sequencer.set_tempo_factor(0.001).unwrap();
        sequencer.start().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x99, 35, 100]);

        sequencer.set_tempo_factor(10.0).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x89, 35, 100]);
    }

    #[test]
    fn test_new_track_releases_held_notes() {
        let (tx, rx) = crossbeam::channel::unbounded::<Vec<u8>>();
        let mut sequencer = MidiSequencer::with_sink(tx);
        let mut pattern = Pattern::new();
        pattern.set(3, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        sequencer.set_tempo_factor(0.0).unwrap();
        sequencer.start().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x99, 38, 100]);

        sequencer
            .set_track(build_track(&Pattern::new(), &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0x89, 38, 0]);
    }

    #[test]
    fn test_loop_end_plays_before_next_pass() {
        let (mut sequencer, rx) = fast_sequencer();
        let mut pattern = Pattern::new();
        pattern.set(0, 15, true);
        pattern.set(1, 0, true);

        sequencer
            .set_track(build_track(&pattern, &Kit::standard(), DEFAULT_VELOCITY))
            .unwrap();
        sequencer.set_loop_continuously(true).unwrap();
        sequencer.start().unwrap();

        // tick 0, 1, 15 (note + program change), 16 (note off + markers), tick 0
        let messages: Vec<Vec<u8>> = (0..22).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(messages[0], vec![0x99, 42, 100]);
        assert_eq!(messages[1], vec![0x89, 42, 100]);
        assert_eq!(messages[2], vec![0x99, 35, 100]);
        assert_eq!(messages[3], vec![0xC9, 1]);
        assert_eq!(messages[4], vec![0x89, 35, 100]);
        assert!(messages[5..21].iter().all(|m| m == &vec![0xB1, 127, 0]));
        assert_eq!(messages[21], vec![0x99, 42, 100]);
    }
}
