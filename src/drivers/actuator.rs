//! Blower + auger actuator.
//!
//! Turns on/off/level intents into timed channel commands.  The blower is
//! a continuous (PWM) channel; the auger pump is a binary channel.
//!
//! ## Ordering contract
//!
//! The pump is always commanded `lead_offset` seconds after the blower, so
//! the auger never moves fuel before air is already commanded (and, on the
//! way down, never runs past the blower's own off command by more than the
//! same offset).
//!
//! The actuator never reads a clock and never schedules.  Every method
//! takes the future time at which its command must take effect.

use log::debug;

use crate::app::ports::{BinaryOutput, ContinuousOutput};

pub const BLOWER_FULL: f64 = 1.0;
pub const BLOWER_OFF: f64 = 0.0;

pub struct Actuator {
    blower: Box<dyn ContinuousOutput>,
    pump: Box<dyn BinaryOutput>,
    lead_offset: f64,
    low_level: f64,
    is_on: bool,
    last_blower_level: f64,
}

impl Actuator {
    pub fn new(
        blower: Box<dyn ContinuousOutput>,
        pump: Box<dyn BinaryOutput>,
        lead_offset: f64,
        low_level: f64,
    ) -> Self {
        Self {
            blower,
            pump,
            lead_offset,
            low_level,
            is_on: false,
            last_blower_level: BLOWER_OFF,
        }
    }

    /// One-time channel setup: no blower watchdog, the given PWM period,
    /// and both channels starting and shutting down inactive.
    pub fn configure(&mut self, cycle_time: f64, hardware_pwm: bool) {
        self.blower.configure_max_duration(0.0);
        self.blower.configure_cycle_time(cycle_time, hardware_pwm);
        self.blower.configure_start_value(BLOWER_OFF, BLOWER_OFF);
        self.pump.configure_start_value(false, false);
    }

    pub fn turn_on(&mut self, time: f64) {
        self.is_on = true;
        self.blower.set_level(time, BLOWER_FULL);
        self.pump.set_bit(time + self.lead_offset, true);
        self.last_blower_level = BLOWER_FULL;
        debug!("ACTUATOR: on at {:.3}", time);
    }

    pub fn turn_off(&mut self, time: f64) {
        self.is_on = false;
        self.blower.set_level(time, BLOWER_OFF);
        self.pump.set_bit(time + self.lead_offset, false);
        self.last_blower_level = BLOWER_OFF;
        debug!("ACTUATOR: off at {:.3}", time);
    }

    pub fn set_blower_high(&mut self, time: f64) {
        self.set_blower(time, BLOWER_FULL);
    }

    pub fn set_blower_low(&mut self, time: f64) {
        self.set_blower(time, self.low_level);
    }

    pub fn set_blower_off(&mut self, time: f64) {
        self.set_blower(time, BLOWER_OFF);
    }

    fn set_blower(&mut self, time: f64, level: f64) {
        self.blower.set_level(time, level);
        self.last_blower_level = level;
        debug!("ACTUATOR: blower {:.2} at {:.3}", level, time);
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn last_blower_level(&self) -> f64 {
        self.last_blower_level
    }
}
