use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::kit::{Instrument, Kit};
use crate::timing::DEFAULT_VELOCITY;

pub const DEFAULT_SETTINGS_FILE: &str = "beatbox.ron";

#[derive(Debug, Clone, PartialEq)]
pub struct MidiSettings {
    pub client_name: String,
    /// Substring of the output port name; the first port when unset.
    pub port: Option<String>,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            client_name: "beatbox".to_string(),
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub midi: MidiSettings,
    pub velocity: u8,
    pub kit: Kit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            midi: MidiSettings::default(),
            velocity: DEFAULT_VELOCITY,
            kit: Kit::standard(),
        }
    }
}

/// On-disk form: every field optional so a file can override just a part.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SettingsFile {
    midi: Option<MidiSection>,
    velocity: Option<u8>,
    kit: Option<Vec<Instrument>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MidiSection {
    client_name: Option<String>,
    port: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: SettingsFile = ron::from_str(&content)?;
        let mut settings = Self::default();
        settings.apply(file);
        Ok(settings)
    }

    fn apply(&mut self, file: SettingsFile) {
        if let Some(midi) = file.midi {
            if let Some(name) = midi.client_name {
                self.midi.client_name = name;
            }
            if midi.port.is_some() {
                self.midi.port = midi.port;
            }
        }
        if let Some(velocity) = file.velocity {
            self.velocity = velocity;
        }
        if let Some(instruments) = file.kit {
            match Kit::from_instruments(instruments) {
                Ok(kit) => self.kit = kit,
                Err(e) => tracing::warn!("Ignoring kit override: {}", e),
            }
        }
    }
}

/// Explicit path first, then `beatbox.ron` in the working directory, then
/// defaults. A broken file is reported and skipped.
pub fn resolve(explicit: Option<&Path>) -> Settings {
    let path: Option<PathBuf> = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_SETTINGS_FILE);
            local.exists().then_some(local)
        }
    };

    let Some(path) = path else {
        return Settings::default();
    };

    match Settings::load(&path) {
        Ok(settings) => {
            tracing::info!("Loaded settings from {}", path.display());
            settings
        }
        Err(e) => {
            tracing::warn!("Invalid settings file {}, using defaults: {}", path.display(), e);
            Settings::default()
        }
    }
}
