//! Transition handlers.
//!
//! Plain functions over [`FeedState`]: no channels, no timers, no clock.
//! Each one returns what the caller must do to the outside world, and
//! the caller does it before releasing the lock.
//!
//! ```text
//!  IDLE ──[feeding_enter]──▶ FEEDING
//!    ▲                          │
//!    └─────[feeding_exit]───────┘
//!
//!  FEEDING ──[feeding_update]──▶ FEEDING   (Hold | Apply(level))
//! ```

use log::{debug, info};

use crate::app::ports::TimerHandle;
use crate::sensors::pellet::SensorState;

use super::FeedPhase;
use super::context::FeedState;

/// Blower level chosen by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlowerTarget {
    /// Pellets present: throttle down after the buffer window.
    Low,
    /// Pellets absent: full air after the drain window.
    High,
}

/// What a tick should do, decided under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    /// The mechanism is idle; unregister without touching the actuator.
    Shutdown,
    /// Tick belongs to an earlier feeding session; unregister silently.
    Stale,
    /// Current reading already applied; reschedule.
    Hold,
    /// Issue this blower level, then reschedule.
    Apply(BlowerTarget),
}

/// Result of leaving the feeding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    AlreadyIdle,
    Stopped { cancel: Option<TimerHandle> },
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE → FEEDING
// ═══════════════════════════════════════════════════════════════════════════

/// Enter the feeding phase.  Returns the new session epoch, or `None` if
/// already feeding.
pub fn feeding_enter(state: &mut FeedState) -> Option<u64> {
    if state.feeding {
        return None;
    }
    state.feeding = true;
    state.epoch = state.epoch.wrapping_add(1);
    // First tick of a session always re-evaluates the blower.
    state.level_applied = false;
    info!(
        "FEED: {} -> {} (session {})",
        FeedPhase::Idle.name(),
        FeedPhase::Feeding.name(),
        state.epoch
    );
    Some(state.epoch)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FEEDING → IDLE
// ═══════════════════════════════════════════════════════════════════════════

pub fn feeding_exit(state: &mut FeedState) -> StopAction {
    if !state.feeding {
        return StopAction::AlreadyIdle;
    }
    let cancel = state.timer.take();
    state.feeding = false;
    state.last_sensor_state = SensorState::Absent;
    state.accepted_sensor_state = SensorState::Absent;
    info!(
        "FEED: {} -> {} (session {})",
        FeedPhase::Feeding.name(),
        FeedPhase::Idle.name(),
        state.epoch
    );
    StopAction::Stopped { cancel }
}

/// Undo a `feeding_enter` whose tick could not be registered.  Sensor
/// readings are kept.
pub fn feeding_abort(state: &mut FeedState) {
    state.feeding = false;
    state.timer = None;
    info!(
        "FEED: {} -> {} (session {} aborted)",
        FeedPhase::Feeding.name(),
        FeedPhase::Idle.name(),
        state.epoch
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  Sensor edge
// ═══════════════════════════════════════════════════════════════════════════

/// Record a raw edge.  Returns `true` if it re-armed a recompute.
///
/// The raw reading is always kept.  Only an edge outside the debounce
/// window replaces the accepted reading the next tick acts on.
pub fn record_edge(state: &mut FeedState, event_time: f64, reading: SensorState) -> bool {
    state.last_sensor_state = reading;
    if state.debouncer.observe(event_time) {
        state.accepted_sensor_state = reading;
        state.level_applied = false;
        true
    } else {
        debug!("SENSOR: {:?} at {:.3} inside debounce window", reading, event_time);
        false
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FEEDING self-transition
// ═══════════════════════════════════════════════════════════════════════════

/// Decide a tick registered under session `epoch`.
pub fn feeding_update(state: &mut FeedState, epoch: u64) -> TickStep {
    if !state.feeding {
        return TickStep::Shutdown;
    }
    if epoch != state.epoch {
        debug!("FEED: dropping tick from session {} (now {})", epoch, state.epoch);
        return TickStep::Stale;
    }
    if state.level_applied {
        return TickStep::Hold;
    }

    state.level_applied = true;
    match state.accepted_sensor_state {
        SensorState::Present => TickStep::Apply(BlowerTarget::Low),
        SensorState::Absent => TickStep::Apply(BlowerTarget::High),
    }
}
