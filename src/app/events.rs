//! Outbound status.
//!
//! [`FeedStatus`] is a point-in-time snapshot of the controller, taken
//! under its lock so every field is mutually consistent.  Serialisable
//! so adapters can log it or ship it over whatever status channel the
//! host exposes.

use serde::Serialize;

use crate::fsm::FeedPhase;
use crate::sensors::pellet::SensorState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    pub phase: FeedPhase,
    pub feeding: bool,
    /// A periodic tick is registered.
    pub timer_armed: bool,
    /// Raw reading from the most recent edge.
    pub sensor: SensorState,
    /// Reading the blower level follows.
    pub accepted_sensor: SensorState,
    pub last_sensor_event_time: Option<f64>,
    /// The current sensor reading has been written to the blower.
    pub level_applied: bool,
    pub actuator_on: bool,
    pub blower_level: f64,
    /// Number of feeding sessions started since boot.
    pub session: u64,
}
