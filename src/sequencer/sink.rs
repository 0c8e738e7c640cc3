use midir::{MidiOutput, MidiOutputConnection};

use crate::config::MidiSettings;
use crate::{Error, Result};

/// Anything the player can write raw MIDI bytes to.
pub trait MidiSink: Send + 'static {
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

impl MidiSink for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        MidiOutputConnection::send(self, message)?;
        Ok(())
    }
}

impl MidiSink for crossbeam::channel::Sender<Vec<u8>> {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        crossbeam::channel::Sender::send(self, message.to_vec()).map_err(|_| Error::PlayerGone)
    }
}

pub fn list_output_ports(client_name: &str) -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(client_name)?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}

/// Connects to the first output whose name contains the configured filter,
/// or to the first output at all when no filter is set.
pub fn open_output(settings: &MidiSettings) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new(&settings.client_name)?;
    let ports = midi_out.ports();

    let port = match &settings.port {
        Some(filter) => ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .is_ok_and(|name| name.contains(filter.as_str()))
            })
            .ok_or_else(|| Error::PortNotFound(filter.clone()))?,
        None => ports.first().ok_or(Error::NoOutputPort)?,
    };

    let name = midi_out.port_name(port).unwrap_or_default();
    tracing::info!("Connecting to MIDI output: {}", name);

    midi_out
        .connect(port, &format!("{}-out", settings.client_name))
        .map_err(|e| Error::Connect(e.to_string()))
}
