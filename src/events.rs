use crate::{Error, Result};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;

/// General MIDI percussion lives on the tenth channel (zero-based 9).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// A validated channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortMessage {
    status: u8,
    data1: u8,
    data2: u8,
}

impl ShortMessage {
    pub fn new(command: u8, channel: u8, data1: u8, data2: u8) -> Result<Self> {
        let invalid = |reason| Error::InvalidMessage {
            command,
            channel,
            data1,
            data2,
            reason,
        };

        if !(NOTE_OFF..=PITCH_BEND).contains(&command) || command & 0x0F != 0 {
            return Err(invalid("not a channel voice command"));
        }
        if channel > 15 {
            return Err(invalid("channel out of range"));
        }
        if data1 > 127 {
            return Err(invalid("first data byte out of range"));
        }

        let data2 = if data_length(command) > 1 {
            if data2 > 127 {
                return Err(invalid("second data byte out of range"));
            }
            data2
        } else {
            0
        };

        Ok(Self {
            status: command | channel,
            data1,
            data2,
        })
    }

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Result<Self> {
        Self::new(NOTE_ON, channel, key, velocity)
    }

    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Result<Self> {
        Self::new(NOTE_OFF, channel, key, velocity)
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn command(&self) -> u8 {
        self.status & 0xF0
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    pub fn data1(&self) -> u8 {
        self.data1
    }

    pub fn data2(&self) -> u8 {
        self.data2
    }

    /// Wire bytes, two or three depending on the command.
    pub fn bytes(&self) -> Vec<u8> {
        match data_length(self.command()) {
            1 => vec![self.status, self.data1],
            _ => vec![self.status, self.data1, self.data2],
        }
    }
}

fn data_length(command: u8) -> usize {
    match command {
        PROGRAM_CHANGE | CHANNEL_PRESSURE => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub message: ShortMessage,
    pub tick: u64,
}

impl MidiEvent {
    pub fn new(message: ShortMessage, tick: u64) -> Self {
        Self { message, tick }
    }
}
