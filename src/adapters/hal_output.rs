//! Timed output channels over `embedded-hal` pins.
//!
//! The controller only ever issues future-dated commands.  These adapters
//! hold them in a fixed-capacity queue and apply each one when
//! [`TimedPwmOutput::service`] / [`TimedDigitalOutput::service`] is called
//! with a time at or past its due time.
//!
//! ## Max duration
//!
//! When a non-zero max duration is configured, a value other than the
//! shutdown value that has been held longer than that without a new
//! command is forced back to the shutdown value.  This is the channel's
//! own watchdog; the feed controller configures the blower with 0
//! (disabled).
//!
//! ## Dual-target design
//!
//! On real hardware the pins are the board's PWM/GPIO drivers.  On the
//! host, [`SimPwmPin`] and [`SimOutputPin`] track state in memory only.

use core::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use heapless::Vec;
use log::{error, info, warn};

use crate::app::ports::{BinaryOutput, ContinuousOutput};

/// Pending commands per channel.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

// ═══════════════════════════════════════════════════════════════
//  Command queue
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending<V> {
    time: f64,
    value: V,
}

/// Time-ordered queue of pending commands.  Equal times keep issue order.
#[derive(Debug)]
struct CommandQueue<V> {
    entries: Vec<Pending<V>, COMMAND_QUEUE_DEPTH>,
}

impl<V: Copy> CommandQueue<V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert in time order.  When full, hands back the earliest entry so
    /// the caller can apply it early rather than lose it.
    fn push(&mut self, time: f64, value: V) -> Option<Pending<V>> {
        let evicted = if self.entries.is_full() {
            Some(self.entries.remove(0))
        } else {
            None
        };
        let at = self.entries.partition_point(|p| p.time <= time);
        // Cannot fail: a slot was freed above if the queue was full.
        let _ = self.entries.insert(at, Pending { time, value });
        evicted
    }

    fn pop_due(&mut self, now: f64) -> Option<Pending<V>> {
        match self.entries.first() {
            Some(p) if p.time <= now => Some(self.entries.remove(0)),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ═══════════════════════════════════════════════════════════════
//  PWM channel
// ═══════════════════════════════════════════════════════════════

pub struct TimedPwmOutput<P> {
    name: String,
    pin: P,
    queue: CommandQueue<f64>,
    level: f64,
    held_since: f64,
    shutdown: f64,
    max_duration: f64,
    cycle_time: f64,
    hardware_pwm: bool,
}

impl<P: SetDutyCycle> TimedPwmOutput<P> {
    pub fn new(name: &str, pin: P) -> Self {
        Self {
            name: name.to_string(),
            pin,
            queue: CommandQueue::new(),
            level: 0.0,
            held_since: 0.0,
            shutdown: 0.0,
            max_duration: 0.0,
            cycle_time: 0.0,
            hardware_pwm: false,
        }
    }

    /// Apply every command due at or before `now`, then enforce max duration.
    pub fn service(&mut self, now: f64) {
        while let Some(cmd) = self.queue.pop_due(now) {
            self.apply(cmd.time, cmd.value);
        }
        if self.max_duration > 0.0
            && self.level != self.shutdown
            && now - self.held_since > self.max_duration
        {
            warn!("{}: held {:.2} past max duration, forcing shutdown value", self.name, self.level);
            self.apply(now, self.shutdown);
        }
    }

    fn apply(&mut self, time: f64, level: f64) {
        let level = level.clamp(0.0, 1.0);
        let max = self.pin.max_duty_cycle();
        let duty = (level * f64::from(max)).round() as u16;
        if let Err(e) = self.pin.set_duty_cycle(duty) {
            error!("{}: duty write failed: {:?}", self.name, pwm::Error::kind(&e));
            return;
        }
        if level != self.level {
            info!("{}: level {:.2} at {:.3}", self.name, level, time);
        }
        self.level = level;
        self.held_since = time;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn cycle_time(&self) -> (f64, bool) {
        (self.cycle_time, self.hardware_pwm)
    }
}

impl<P: SetDutyCycle + Send> ContinuousOutput for TimedPwmOutput<P> {
    fn set_level(&mut self, time: f64, level: f64) {
        if let Some(early) = self.queue.push(time, level) {
            warn!("{}: command queue full, applying {:.3} early", self.name, early.time);
            self.apply(early.time, early.value);
        }
    }

    fn configure_max_duration(&mut self, secs: f64) {
        self.max_duration = secs;
    }

    fn configure_cycle_time(&mut self, secs: f64, hardware_pwm: bool) {
        self.cycle_time = secs;
        self.hardware_pwm = hardware_pwm;
        info!(
            "{}: cycle time {:.4}s ({})",
            self.name,
            secs,
            if hardware_pwm { "hardware" } else { "software" }
        );
    }

    fn configure_start_value(&mut self, start: f64, shutdown: f64) {
        self.shutdown = shutdown.clamp(0.0, 1.0);
        self.apply(0.0, start);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Digital channel
// ═══════════════════════════════════════════════════════════════

pub struct TimedDigitalOutput<P> {
    name: String,
    pin: P,
    queue: CommandQueue<bool>,
    on: bool,
    held_since: f64,
    shutdown: bool,
    max_duration: f64,
}

impl<P: OutputPin> TimedDigitalOutput<P> {
    pub fn new(name: &str, pin: P) -> Self {
        Self {
            name: name.to_string(),
            pin,
            queue: CommandQueue::new(),
            on: false,
            held_since: 0.0,
            shutdown: false,
            max_duration: 0.0,
        }
    }

    /// Apply every command due at or before `now`, then enforce max duration.
    pub fn service(&mut self, now: f64) {
        while let Some(cmd) = self.queue.pop_due(now) {
            self.apply(cmd.time, cmd.value);
        }
        if self.max_duration > 0.0
            && self.on != self.shutdown
            && now - self.held_since > self.max_duration
        {
            warn!("{}: held past max duration, forcing shutdown value", self.name);
            self.apply(now, self.shutdown);
        }
    }

    fn apply(&mut self, time: f64, on: bool) {
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = res {
            error!("{}: pin write failed: {:?}", self.name, digital::Error::kind(&e));
            return;
        }
        if on != self.on {
            info!("{}: {} at {:.3}", self.name, if on { "on" } else { "off" }, time);
        }
        self.on = on;
        self.held_since = time;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<P: OutputPin + Send> BinaryOutput for TimedDigitalOutput<P> {
    fn set_bit(&mut self, time: f64, on: bool) {
        if let Some(early) = self.queue.push(time, on) {
            warn!("{}: command queue full, applying {:.3} early", self.name, early.time);
            self.apply(early.time, early.value);
        }
    }

    fn configure_max_duration(&mut self, secs: f64) {
        self.max_duration = secs;
    }

    fn configure_start_value(&mut self, start: bool, shutdown: bool) {
        self.shutdown = shutdown;
        self.apply(0.0, start);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared channel
// ═══════════════════════════════════════════════════════════════

/// A channel owned jointly by the controller (which commands it) and the
/// host loop (which services it).
pub struct Shared<T>(Arc<CriticalSectionMutex<RefCell<T>>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(CriticalSectionMutex::new(RefCell::new(inner))))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.0.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ContinuousOutput> ContinuousOutput for Shared<T> {
    fn set_level(&mut self, time: f64, level: f64) {
        self.with(|c| c.set_level(time, level));
    }

    fn configure_max_duration(&mut self, secs: f64) {
        self.with(|c| c.configure_max_duration(secs));
    }

    fn configure_cycle_time(&mut self, secs: f64, hardware_pwm: bool) {
        self.with(|c| c.configure_cycle_time(secs, hardware_pwm));
    }

    fn configure_start_value(&mut self, start: f64, shutdown: f64) {
        self.with(|c| c.configure_start_value(start, shutdown));
    }
}

impl<T: BinaryOutput> BinaryOutput for Shared<T> {
    fn set_bit(&mut self, time: f64, on: bool) {
        self.with(|c| c.set_bit(time, on));
    }

    fn configure_max_duration(&mut self, secs: f64) {
        self.with(|c| c.configure_max_duration(secs));
    }

    fn configure_start_value(&mut self, start: bool, shutdown: bool) {
        self.with(|c| c.configure_start_value(start, shutdown));
    }
}

// ═══════════════════════════════════════════════════════════════
//  Simulation pins
// ═══════════════════════════════════════════════════════════════

/// In-memory PWM pin.  Clones share the same duty register.
#[derive(Debug, Clone)]
pub struct SimPwmPin {
    duty: Arc<AtomicU16>,
    max: u16,
}

impl SimPwmPin {
    pub fn new(max: u16) -> Self {
        Self {
            duty: Arc::default(),
            max,
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::Relaxed)
    }
}

impl pwm::ErrorType for SimPwmPin {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for SimPwmPin {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.store(duty.min(self.max), Ordering::Relaxed);
        Ok(())
    }
}

/// In-memory GPIO output.  Clones share the same level.
#[derive(Debug, Clone, Default)]
pub struct SimOutputPin {
    high: Arc<AtomicBool>,
}

impl SimOutputPin {
    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::Relaxed)
    }
}

impl digital::ErrorType for SimOutputPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.store(true, Ordering::Relaxed);
        Ok(())
    }
}
