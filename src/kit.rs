use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const INSTRUMENT_COUNT: usize = 16;

/// One drum of the percussion channel: each key is a different sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub key: u8,
}

impl Instrument {
    pub fn new(name: impl Into<String>, key: u8) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }
}

/// Ordered instrument table. Index `i` drives row `i` of the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kit {
    instruments: [Instrument; INSTRUMENT_COUNT],
}

const STANDARD_KIT: [(&str, u8); INSTRUMENT_COUNT] = [
    ("Bass Drum", 35),
    ("Closed Hi-Hat", 42),
    ("Open Hi-Hat", 46),
    ("Acoustic Snare", 38),
    ("Crash Cymbal", 49),
    ("Hand Clap", 39),
    ("High Tom", 50),
    ("Hi Bongo", 60),
    ("Maracas", 70),
    ("Whistle", 72),
    ("Low Conga", 64),
    ("Cowbell", 56),
    ("Vibraslap", 58),
    ("Low-mid Tom", 47),
    ("High Agogo", 67),
    ("Open Hi Conga", 63),
];

impl Kit {
    pub fn standard() -> Self {
        Self {
            instruments: STANDARD_KIT.map(|(name, key)| Instrument::new(name, key)),
        }
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> Result<Self> {
        let actual = instruments.len();
        let instruments: [Instrument; INSTRUMENT_COUNT] =
            instruments.try_into().map_err(|_| Error::KitSize {
                expected: INSTRUMENT_COUNT,
                actual,
            })?;
        Ok(Self { instruments })
    }

    pub fn get(&self, row: usize) -> Option<&Instrument> {
        self.instruments.get(row)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }
}

impl Default for Kit {
    fn default() -> Self {
        Self::standard()
    }
}
