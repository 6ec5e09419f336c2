//! Mutable feed state guarded by the controller's lock.
//!
//! `FeedState` is the single struct the transition handlers read and
//! write.  It is only ever touched inside the controller's critical
//! section, so none of its fields need their own synchronisation.

use crate::app::ports::TimerHandle;
use crate::sensors::pellet::{PelletDebouncer, SensorState};

use super::FeedPhase;

pub struct FeedState {
    /// Whether the mechanism is currently active.
    pub feeding: bool,
    /// Most recent sensor reading, recorded on every edge.
    pub last_sensor_state: SensorState,
    /// Reading carried by the last edge outside the debounce window.
    /// Blower decisions use this, not the raw reading.
    pub accepted_sensor_state: SensorState,
    /// Edge-spacing filter; owns the last raw edge time.
    pub debouncer: PelletDebouncer,
    /// Whether `last_sensor_state` has already been written to the blower.
    pub level_applied: bool,
    /// Present iff a tick is registered.  Must equal `feeding` between lock releases.
    pub timer: Option<TimerHandle>,
    /// Incremented on every Idle → Feeding transition.  Ticks carry the
    /// epoch they were registered under.
    pub epoch: u64,
}

impl FeedState {
    pub fn new(debounce_time: f64) -> Self {
        Self {
            feeding: false,
            last_sensor_state: SensorState::Absent,
            accepted_sensor_state: SensorState::Absent,
            debouncer: PelletDebouncer::new(debounce_time),
            level_applied: false,
            timer: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> FeedPhase {
        if self.feeding {
            FeedPhase::Feeding
        } else {
            FeedPhase::Idle
        }
    }

    pub fn last_sensor_event_time(&self) -> Option<f64> {
        self.debouncer.last_event_time()
    }

    /// A tick is registered exactly when the mechanism is feeding.
    pub fn timer_matches_phase(&self) -> bool {
        self.timer.is_some() == self.feeding
    }
}
