//! Feed controller, the application core.
//!
//! [`FeedController`] owns the feed state, the actuator and the timer
//! service, all behind one blocking mutex.  Sensor edges arrive from the
//! sensor watcher's context, ticks from the timer dispatcher, movement
//! requests and lifecycle events from the host; every entry point takes
//! the lock for its whole O(1) critical section.
//!
//! ```text
//!  SensorWatcher ──▶ ┌──────────────────────────┐ ──▶ Actuator (blower, pump)
//!  TimerService  ──▶ │      FeedController       │
//!  movement/idle ──▶ │  FeedState · transitions  │ ──▶ TimerService (register/cancel)
//!                    └──────────────────────────┘
//! ```
//!
//! Tick registration and cancellation both happen with the lock held, so
//! once `stop_feeding` returns no tick can observe `feeding == true` for
//! the session it ended.

use core::cell::RefCell;
use std::sync::{Arc, Weak};

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use log::{error, info};

use crate::config::FeedConfig;
use crate::drivers::actuator::Actuator;
use crate::error::Result;
use crate::fsm::context::FeedState;
use crate::fsm::states::{self, BlowerTarget, StopAction, TickStep};
use crate::fsm::{FeedPhase, TickOutcome};
use crate::sensors::pellet::SensorState;

use super::commands::LifecycleEvent;
use super::events::FeedStatus;
use super::ports::{
    Clock, PinFactory, SensorWatcher, TimerCallback, TimerService, WakeTime,
};

// ───────────────────────────────────────────────────────────────
// Construction inputs
// ───────────────────────────────────────────────────────────────

/// External collaborators handed to [`FeedController::new`].
///
/// The pin factory and sensor watcher are only needed during
/// construction; the timer service and clock are kept for the
/// controller's lifetime.
pub struct FeedPorts<'a> {
    pub pins: &'a mut dyn PinFactory,
    pub watcher: &'a mut dyn SensorWatcher,
    pub timer: Box<dyn TimerService>,
    pub clock: Box<dyn Clock>,
}

/// Everything mutated under the lock.
struct Locked {
    state: FeedState,
    actuator: Actuator,
    timer: Box<dyn TimerService>,
}

// ───────────────────────────────────────────────────────────────
// FeedController
// ───────────────────────────────────────────────────────────────

pub struct FeedController {
    me: Weak<FeedController>,
    config: FeedConfig,
    clock: Box<dyn Clock>,
    inner: CriticalSectionMutex<RefCell<Locked>>,
}

impl FeedController {
    /// Validate the config, resolve the pins, subscribe to sensor edges,
    /// then configure the channels.
    ///
    /// Validation runs before any pin is resolved.  Channels are configured
    /// only once every pin is resolved and the sensor subscription has
    /// succeeded, so a failed construction never touches a channel.  The
    /// controller starts `Idle`.
    pub fn new(config: FeedConfig, ports: FeedPorts<'_>) -> Result<Arc<Self>> {
        config
            .validate()
            .inspect_err(|e| error!("FEED: rejecting config: {e}"))?;

        let FeedPorts {
            pins,
            watcher,
            timer,
            clock,
        } = ports;

        let blower = pins.setup_continuous(&config.blower_pin)?;
        let pump = pins.setup_binary(&config.pump_pin)?;
        let sensor = pins.setup_sensor(&config.pellet_sensor_pin)?;

        let actuator = Actuator::new(blower, pump, config.channel_lead, config.blower_low_level);
        let state = FeedState::new(config.debounce_time);

        let controller = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            clock,
            inner: CriticalSectionMutex::new(RefCell::new(Locked {
                state,
                actuator,
                timer,
            })),
        });

        let relay = Arc::downgrade(&controller);
        watcher
            .register_edge_callback(
                &sensor,
                Box::new(move |event_time, reading| {
                    if let Some(c) = relay.upgrade() {
                        c.sensor_callback(event_time, reading);
                    }
                }),
            )
            .inspect_err(|e| error!("FEED: sensor subscription failed: {e}"))?;

        let (cycle_time, hardware_pwm) =
            (controller.config.cycle_time, controller.config.hardware_pwm);
        controller.with_locked(|l| l.actuator.configure(cycle_time, hardware_pwm));

        info!(
            "FEED: ready (blower={}, pump={}, sensor={}, buffer={:.2}s, drain={:.2}s, debounce={:.3}s)",
            controller.config.blower_pin,
            controller.config.pump_pin,
            sensor.name,
            controller.config.buffer_time,
            controller.config.drain_time,
            controller.config.debounce_time,
        );
        Ok(controller)
    }

    // ── Entry points ──────────────────────────────────────────

    /// The mechanism must be feeding by `print_time`.  Arms the feed
    /// `spool_up_time` earlier.  Repeated calls while feeding are no-ops.
    pub fn update_next_movement_time(&self, print_time: f64) -> Result<()> {
        self.start_feeding(print_time - self.config.spool_up_time)
    }

    /// Idle → Feeding: actuator on at `time`, tick registered for "now".
    ///
    /// If the timer service refuses the tick, the transition is rolled
    /// back (actuator off at `time`) and the error returned.
    pub fn start_feeding(&self, time: f64) -> Result<()> {
        self.with_locked(|l| {
            let Some(epoch) = states::feeding_enter(&mut l.state) else {
                return Ok(());
            };
            l.actuator.turn_on(time);

            match l.timer.register(self.tick_callback(epoch), WakeTime::Now) {
                Ok(handle) => {
                    l.state.timer = Some(handle);
                    Ok(())
                }
                Err(e) => {
                    error!("FEED: tick registration failed: {e}");
                    states::feeding_abort(&mut l.state);
                    l.actuator.turn_off(time);
                    Err(e.into())
                }
            }
        })
    }

    /// Feeding → Idle: tick cancelled, reading reset, actuator off at `time`.
    pub fn stop_feeding(&self, time: f64) {
        self.with_locked(|l| Self::stop_locked(l, time));
    }

    /// Raw sensor edge.  Records the reading; re-arms a blower recompute
    /// unless the edge falls inside the debounce window.
    pub fn sensor_callback(&self, event_time: f64, reading: SensorState) {
        self.with_locked(|l| {
            states::record_edge(&mut l.state, event_time, reading);
        });
    }

    /// Periodic re-evaluation for the current session.
    pub fn tick(&self, event_time: f64) -> TickOutcome {
        self.run_tick(None, event_time)
    }

    /// Host lifecycle hook; every event stops the feed at `time`.
    pub fn handle_lifecycle(&self, event: LifecycleEvent, time: f64) {
        info!(
            "FEED: lifecycle {} at {:.3} while {}",
            event.name(),
            time,
            self.phase().name()
        );
        self.stop_feeding(time);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> FeedStatus {
        self.with_locked(|l| FeedStatus {
            phase: l.state.phase(),
            feeding: l.state.feeding,
            timer_armed: l.state.timer.is_some(),
            sensor: l.state.last_sensor_state,
            accepted_sensor: l.state.accepted_sensor_state,
            last_sensor_event_time: l.state.last_sensor_event_time(),
            level_applied: l.state.level_applied,
            actuator_on: l.actuator.is_on(),
            blower_level: l.actuator.last_blower_level(),
            session: l.state.epoch,
        })
    }

    pub fn phase(&self) -> FeedPhase {
        self.with_locked(|l| l.state.phase())
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn with_locked<R>(&self, f: impl FnOnce(&mut Locked) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn stop_locked(l: &mut Locked, time: f64) {
        if let StopAction::Stopped { cancel } = states::feeding_exit(&mut l.state) {
            if let Some(handle) = cancel {
                l.timer.cancel(handle);
            }
            l.actuator.turn_off(time);
        }
    }

    /// Callback registered for session `epoch`.  Holds only a weak
    /// reference; a dropped controller cancels its own tick.
    fn tick_callback(&self, epoch: u64) -> TimerCallback {
        let me = self.me.clone();
        Box::new(move |event_time| match me.upgrade() {
            Some(c) => c.run_tick(Some(epoch), event_time),
            None => TickOutcome::Cancel,
        })
    }

    fn run_tick(&self, session: Option<u64>, event_time: f64) -> TickOutcome {
        let target = self.clock.to_schedule_time(event_time) + self.config.lead_margin;
        let next_wake = event_time + self.config.tick_period;

        self.with_locked(|l| {
            let epoch = session.unwrap_or(l.state.epoch);
            match states::feeding_update(&mut l.state, epoch) {
                TickStep::Shutdown => {
                    Self::stop_locked(l, target);
                    TickOutcome::Cancel
                }
                TickStep::Stale => TickOutcome::Cancel,
                TickStep::Hold => TickOutcome::Reschedule(next_wake),
                TickStep::Apply(BlowerTarget::Low) => {
                    let at = target + self.config.buffer_time;
                    info!("FEED: pellets present, blower low at {:.3}", at);
                    l.actuator.set_blower_low(at);
                    TickOutcome::Reschedule(next_wake)
                }
                TickStep::Apply(BlowerTarget::High) => {
                    let at = target + self.config.drain_time;
                    info!("FEED: pellets absent, blower high at {:.3}", at);
                    l.actuator.set_blower_high(at);
                    TickOutcome::Reschedule(next_wake)
                }
            }
        })
    }
}
