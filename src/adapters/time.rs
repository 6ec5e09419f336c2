//! Linear clock adapter.
//!
//! Maps event times onto the schedule clock as `offset + event * rate`.
//! Good enough for a host whose sensor and output clocks share a crystal;
//! drift estimation against a remote clock lives outside this crate.

use crate::app::ports::Clock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearClock {
    offset: f64,
    rate: f64,
}

impl LinearClock {
    pub fn new(offset: f64, rate: f64) -> Self {
        Self { offset, rate }
    }

    /// Event time and schedule time are the same clock.
    pub fn identity() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl Default for LinearClock {
    fn default() -> Self {
        Self::identity()
    }
}

impl Clock for LinearClock {
    fn to_schedule_time(&self, event_time: f64) -> f64 {
        self.offset + event_time * self.rate
    }
}
