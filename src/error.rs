use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid MIDI message: {reason} (command {command:#04x}, channel {channel}, data {data1}/{data2})")]
    InvalidMessage {
        command: u8,
        channel: u8,
        data1: u8,
        data2: u8,
        reason: &'static str,
    },

    #[error("a kit needs exactly {expected} instruments, got {actual}")]
    KitSize { expected: usize, actual: usize },

    #[error("failed to create MIDI client: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("no MIDI output port available")]
    NoOutputPort,

    #[error("no MIDI output port matching '{0}'")]
    PortNotFound(String),

    #[error("failed to connect to MIDI output: {0}")]
    Connect(String),

    #[error("failed to send MIDI message: {0}")]
    Send(#[from] midir::SendError),

    #[error("sequencer player thread is gone")]
    PlayerGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, Error>;
