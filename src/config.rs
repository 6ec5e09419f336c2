//! Feed controller configuration.
//!
//! All tunable parameters for one pellet feed mechanism.  Loaded from a
//! JSON section and validated before any channel is touched; a config
//! that fails [`FeedConfig::validate`] must never reach the hardware.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    // --- Blower level windows ---
    /// Grace period (seconds) before throttling the blower down once pellets are seen.
    pub buffer_time: f64,
    /// Grace period (seconds) before driving the blower to full once pellets stop.
    pub drain_time: f64,
    /// Blower run-on after feeding stops (seconds).  Validated, unused by the
    /// event-driven shutdown policy.
    pub off_delay_time: f64,
    /// Lead time (seconds) between arming the feed and the requested movement.
    pub spool_up_time: f64,
    /// Minimum spacing (seconds) between sensor edges that trigger a recompute.
    pub debounce_time: f64,

    // --- Blower PWM ---
    /// PWM period of the blower channel (seconds).
    #[serde(default = "default_cycle_time")]
    pub cycle_time: f64,
    /// Use a hardware PWM peripheral for the blower.
    #[serde(default)]
    pub hardware_pwm: bool,
    /// Blower level held while pellets are present (0-1, exclusive).
    #[serde(default = "default_blower_low_level")]
    pub blower_low_level: f64,

    // --- Timing ---
    /// Re-evaluation period while feeding (seconds).
    #[serde(default = "default_tick_period")]
    pub tick_period: f64,
    /// Margin (seconds) added to the converted sensor time so commands land in the future.
    #[serde(default = "default_lead_margin")]
    pub lead_margin: f64,
    /// Delay (seconds) between commanding the blower and commanding the pump.
    #[serde(default = "default_channel_lead")]
    pub channel_lead: f64,

    // --- Pins ---
    pub blower_pin: String,
    pub pump_pin: String,
    #[serde(alias = "sensor_pin")]
    pub pellet_sensor_pin: String,
}

fn default_cycle_time() -> f64 {
    0.010
}

fn default_blower_low_level() -> f64 {
    0.5
}

fn default_tick_period() -> f64 {
    1.0
}

fn default_lead_margin() -> f64 {
    0.100
}

fn default_channel_lead() -> f64 {
    0.010
}

impl FeedConfig {
    /// Parse a JSON object and validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("buffer_time", self.buffer_time),
            ("drain_time", self.drain_time),
            ("off_delay_time", self.off_delay_time),
            ("spool_up_time", self.spool_up_time),
            ("debounce_time", self.debounce_time),
            ("cycle_time", self.cycle_time),
            ("tick_period", self.tick_period),
            ("channel_lead", self.channel_lead),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if !(self.lead_margin.is_finite() && self.lead_margin >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "lead_margin",
                value: self.lead_margin,
            });
        }
        if !(self.blower_low_level > 0.0 && self.blower_low_level < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "blower_low_level",
                value: self.blower_low_level,
            });
        }

        for (field, name) in [
            ("blower_pin", &self.blower_pin),
            ("pump_pin", &self.pump_pin),
            ("pellet_sensor_pin", &self.pellet_sensor_pin),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyPin(field));
            }
        }

        Ok(())
    }
}
