//! Named pin registry.
//!
//! The board wiring step builds every channel up front and registers it
//! under its logical name; [`PinFactory`] lookups then hand each one out
//! exactly once.

use std::collections::{HashMap, HashSet};

use log::info;

use crate::app::ports::{BinaryOutput, ContinuousOutput, PinFactory, SensorPin};
use crate::error::{PinError, PinKind};

enum PinEntry {
    Continuous(Box<dyn ContinuousOutput>),
    Binary(Box<dyn BinaryOutput>),
    Sensor,
}

impl PinEntry {
    fn kind(&self) -> PinKind {
        match self {
            Self::Continuous(_) => PinKind::ContinuousOutput,
            Self::Binary(_) => PinKind::BinaryOutput,
            Self::Sensor => PinKind::PresenceSensor,
        }
    }
}

#[derive(Default)]
pub struct PinRegistry {
    available: HashMap<String, PinEntry>,
    claimed: HashSet<String>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_continuous(&mut self, name: &str, out: Box<dyn ContinuousOutput>) {
        self.available.insert(name.to_string(), PinEntry::Continuous(out));
    }

    pub fn add_binary(&mut self, name: &str, out: Box<dyn BinaryOutput>) {
        self.available.insert(name.to_string(), PinEntry::Binary(out));
    }

    pub fn add_sensor(&mut self, name: &str) {
        self.available.insert(name.to_string(), PinEntry::Sensor);
    }

    fn claim(&mut self, name: &str, want: PinKind) -> Result<PinEntry, PinError> {
        let Some(entry) = self.available.remove(name) else {
            return Err(if self.claimed.contains(name) {
                PinError::AlreadyClaimed(name.to_string())
            } else {
                PinError::Unknown(name.to_string())
            });
        };
        if entry.kind() != want {
            self.available.insert(name.to_string(), entry);
            return Err(PinError::WrongKind {
                name: name.to_string(),
                kind: want,
            });
        }
        self.claimed.insert(name.to_string());
        info!("PINS: '{}' claimed as {}", name, want);
        Ok(entry)
    }
}

impl PinFactory for PinRegistry {
    fn setup_continuous(&mut self, name: &str) -> Result<Box<dyn ContinuousOutput>, PinError> {
        match self.claim(name, PinKind::ContinuousOutput)? {
            PinEntry::Continuous(out) => Ok(out),
            _ => Err(PinError::Unknown(name.to_string())),
        }
    }

    fn setup_binary(&mut self, name: &str) -> Result<Box<dyn BinaryOutput>, PinError> {
        match self.claim(name, PinKind::BinaryOutput)? {
            PinEntry::Binary(out) => Ok(out),
            _ => Err(PinError::Unknown(name.to_string())),
        }
    }

    fn setup_sensor(&mut self, name: &str) -> Result<SensorPin, PinError> {
        self.claim(name, PinKind::PresenceSensor)?;
        Ok(SensorPin {
            name: name.to_string(),
        })
    }
}
