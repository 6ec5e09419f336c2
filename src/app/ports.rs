//! Port traits: the boundary between the feed logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeedController (domain)
//! ```
//!
//! Output channels, the timer service, the clock, the pin factory and the
//! sensor watcher are all external collaborators.  The controller holds
//! them as trait objects so the whole state machine runs on the host
//! against recording mocks.
//!
//! All times are seconds as `f64`.  Output commands are always
//! future-dated in the schedule clock domain; nothing behind these traits
//! may assume "now".

use crate::error::{PinError, TimerError};
use crate::fsm::TickOutcome;
use crate::sensors::pellet::SensorState;

// ───────────────────────────────────────────────────────────────
// Output channels (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A continuously variable output (PWM) commanded at future times.
pub trait ContinuousOutput: Send {
    /// Schedule `level` (0.0–1.0) to take effect at `time`.
    fn set_level(&mut self, time: f64, level: f64);

    /// Longest a non-shutdown value may be held without a refresh.  0 disables.
    fn configure_max_duration(&mut self, secs: f64);

    /// PWM period and whether a hardware PWM peripheral drives it.
    fn configure_cycle_time(&mut self, secs: f64, hardware_pwm: bool);

    /// Level at power-up and the level forced on shutdown.
    fn configure_start_value(&mut self, start: f64, shutdown: f64);
}

/// An on/off output commanded at future times.
pub trait BinaryOutput: Send {
    /// Schedule the output active/inactive at `time`.
    fn set_bit(&mut self, time: f64, on: bool);

    /// Longest the active state may be held without a refresh.  0 disables.
    fn configure_max_duration(&mut self, secs: f64);

    /// State at power-up and the state forced on shutdown.
    fn configure_start_value(&mut self, start: bool, shutdown: bool);
}

// ───────────────────────────────────────────────────────────────
// Pin factory + sensor watcher
// ───────────────────────────────────────────────────────────────

/// A resolved presence-sensor pin, handed back to the sensor watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPin {
    pub name: String,
}

/// Resolves logical pin names into channels.
pub trait PinFactory {
    fn setup_continuous(&mut self, name: &str) -> Result<Box<dyn ContinuousOutput>, PinError>;

    fn setup_binary(&mut self, name: &str) -> Result<Box<dyn BinaryOutput>, PinError>;

    fn setup_sensor(&mut self, name: &str) -> Result<SensorPin, PinError>;
}

/// Callback invoked on every raw sensor edge with the edge's event time.
pub type EdgeCallback = Box<dyn FnMut(f64, SensorState) + Send>;

/// Relays raw sensor edges from their own execution context.
pub trait SensorWatcher {
    fn register_edge_callback(
        &mut self,
        pin: &SensorPin,
        callback: EdgeCallback,
    ) -> Result<(), PinError>;
}

// ───────────────────────────────────────────────────────────────
// Timer service
// ───────────────────────────────────────────────────────────────

/// Opaque reference to a registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u32);

/// When a newly registered timer first fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WakeTime {
    /// As soon as the dispatcher next runs.
    Now,
    At(f64),
}

/// Timer callback: receives the dispatch time, decides the next wake.
pub type TimerCallback = Box<dyn FnMut(f64) -> TickOutcome + Send>;

/// Single-threaded cooperative callback scheduler.
///
/// Callbacks never run concurrently with each other.  Implementations
/// must not invoke a callback from inside `register` or `cancel`.
pub trait TimerService: Send {
    fn register(&mut self, callback: TimerCallback, first_wake: WakeTime)
    -> Result<TimerHandle, TimerError>;

    /// Unregister.  Unknown handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Converts sensor/dispatch event times into the schedule clock domain.
pub trait Clock: Send + Sync {
    fn to_schedule_time(&self, event_time: f64) -> f64;
}
