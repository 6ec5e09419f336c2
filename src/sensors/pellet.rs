//! Pellet presence sensor: reading type and time-window debouncer.
//!
//! The sensor is an endstop-style switch in the feed chute.  It chatters
//! while pellets tumble past, so consecutive edges closer together than
//! the debounce window are treated as bounce.
//!
//! The debouncer only gates *recomputes*.  The controller still records
//! every raw state; a bounced edge just does not become the reading the
//! blower follows.

use serde::Serialize;

/// Pellet sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorState {
    /// Pellets detected flowing.
    Present,
    /// No pellets detected.
    #[default]
    Absent,
}

impl SensorState {
    /// Map a raw pin level (`true` = triggered) to a reading.
    pub fn from_level(triggered: bool) -> Self {
        if triggered {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

/// Time-window debouncer for sensor edges.
#[derive(Debug, Clone)]
pub struct PelletDebouncer {
    debounce_time: f64,
    last_event_time: Option<f64>,
}

impl PelletDebouncer {
    pub fn new(debounce_time: f64) -> Self {
        Self {
            debounce_time,
            last_event_time: None,
        }
    }

    /// Record an edge at `event_time`.
    ///
    /// Returns `true` if the edge may trigger a recompute, `false` if it
    /// landed inside the window opened by the previous edge.  The window
    /// restarts on every edge, bounced or not.
    pub fn observe(&mut self, event_time: f64) -> bool {
        let eligible = match self.last_event_time {
            Some(last) => event_time - last >= self.debounce_time,
            None => true,
        };
        self.last_event_time = Some(event_time);
        eligible
    }

    /// Time of the most recent raw edge.
    pub fn last_event_time(&self) -> Option<f64> {
        self.last_event_time
    }
}
