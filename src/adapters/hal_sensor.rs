//! Polled pellet-sensor relay over an `embedded-hal` input pin.
//!
//! The relay runs in its own context (a polling thread, or the GPIO edge
//! interrupt's bottom half) and forwards every level change to whatever
//! callback the controller registered, stamped with the poll time.
//!
//! The first successful poll always reports, so the controller learns the
//! initial reading without waiting for a transition.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{self, InputPin};
use log::warn;

use crate::app::ports::{EdgeCallback, SensorPin, SensorWatcher};
use crate::error::PinError;
use crate::sensors::pellet::SensorState;

pub struct PolledPresenceSensor<P> {
    name: String,
    pin: P,
    /// Pin reads high when pellets are absent.
    inverted: bool,
    last_level: Option<bool>,
    callback: Option<EdgeCallback>,
}

impl<P: InputPin> PolledPresenceSensor<P> {
    pub fn new(name: &str, pin: P, inverted: bool) -> Self {
        Self {
            name: name.to_string(),
            pin,
            inverted,
            last_level: None,
            callback: None,
        }
    }

    /// Sample the pin at `now`.  Returns the new reading if it changed.
    pub fn poll(&mut self, now: f64) -> Option<SensorState> {
        let raw = match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                warn!("{}: read failed: {:?}", self.name, digital::Error::kind(&e));
                return None;
            }
        };
        let triggered = raw != self.inverted;
        if self.last_level == Some(triggered) {
            return None;
        }
        self.last_level = Some(triggered);

        let reading = SensorState::from_level(triggered);
        if let Some(cb) = self.callback.as_mut() {
            cb(now, reading);
        }
        Some(reading)
    }
}

impl<P: InputPin> SensorWatcher for PolledPresenceSensor<P> {
    fn register_edge_callback(
        &mut self,
        pin: &SensorPin,
        callback: EdgeCallback,
    ) -> Result<(), PinError> {
        if pin.name != self.name {
            return Err(PinError::Unknown(pin.name.clone()));
        }
        if self.callback.is_some() {
            return Err(PinError::AlreadyClaimed(pin.name.clone()));
        }
        self.callback = Some(callback);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Simulation pin
// ═══════════════════════════════════════════════════════════════

/// In-memory GPIO input.  Clones share the same level, so a test or
/// simulation script can drive it while the relay reads it.
#[derive(Debug, Clone, Default)]
pub struct SimInputPin {
    high: Arc<AtomicBool>,
}

impl SimInputPin {
    pub fn set(&self, high: bool) {
        self.high.store(high, Ordering::Relaxed);
    }
}

impl digital::ErrorType for SimInputPin {
    type Error = core::convert::Infallible;
}

impl InputPin for SimInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.load(Ordering::Relaxed))
    }
}
