//! Host timer reactor.
//!
//! A fixed-slot, single-threaded callback dispatcher that implements
//! [`TimerService`] for the simulator and for integration tests.  Time is
//! virtual: the host advances it with [`SimReactor::run_until`], which
//! fires every due timer in wake order.
//!
//! ```text
//!   register ──▶ [slot 0] [slot 1] ... [slot 7]
//!                    │ earliest due wake
//!                    ▼
//!   run_until ──▶ take callback ─▶ call (lock released) ─▶ put back / drop
//! ```
//!
//! Callbacks run with the reactor lock released, so a callback may cancel
//! its own handle (or any other) without deadlocking.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use log::{debug, info, warn};

use crate::app::ports::{TimerCallback, TimerHandle, TimerService, WakeTime};
use crate::error::TimerError;
use crate::fsm::TickOutcome;

/// Maximum number of concurrent timers (stack-allocated).
pub const MAX_TIMERS: usize = 8;

/// Smallest forward step applied when a callback asks to fire in the past.
const MIN_RESCHEDULE_STEP: f64 = 0.001;

/// Forward step for a backwards reschedule at `wake`.  Scales with the
/// magnitude so the sum still moves once the fixed step drops below one ulp.
fn forward_step(wake: f64) -> f64 {
    MIN_RESCHEDULE_STEP.max(wake.abs() * f64::EPSILON)
}

struct TimerSlot {
    handle: TimerHandle,
    wake: f64,
    /// `None` while the callback is executing.
    callback: Option<TimerCallback>,
}

struct ReactorQueue {
    slots: [Option<TimerSlot>; MAX_TIMERS],
    next_id: u32,
    now: f64,
    closed: bool,
}

impl ReactorQueue {
    fn slot_of(&mut self, handle: TimerHandle) -> Option<&mut TimerSlot> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|s| s.handle == handle)
    }

    /// Earliest runnable timer due at or before `end`.
    fn next_due(&self, end: f64) -> Option<(TimerHandle, f64)> {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.callback.is_some() && s.wake <= end)
            .min_by(|a, b| a.wake.total_cmp(&b.wake))
            .map(|s| (s.handle, s.wake))
    }

    fn remove(&mut self, handle: TimerHandle) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.handle == handle) {
                *slot = None;
                return true;
            }
        }
        false
    }
}

/// Cloneable handle to the reactor; clones share one queue.
#[derive(Clone)]
pub struct SimReactor {
    queue: Arc<CriticalSectionMutex<RefCell<ReactorQueue>>>,
}

impl SimReactor {
    pub fn new(start: f64) -> Self {
        Self {
            queue: Arc::new(CriticalSectionMutex::new(RefCell::new(ReactorQueue {
                slots: Default::default(),
                next_id: 1,
                now: start,
                closed: false,
            }))),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ReactorQueue) -> R) -> R {
        self.queue.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Current reactor time.
    pub fn now(&self) -> f64 {
        self.with(|q| q.now)
    }

    /// Number of registered timers.
    pub fn pending(&self) -> usize {
        self.with(|q| q.slots.iter().flatten().count())
    }

    /// Drop every timer and refuse new registrations.
    pub fn close(&self) {
        self.with(|q| {
            q.closed = true;
            q.slots = Default::default();
        });
        info!("Reactor: closed");
    }

    /// Fire every timer due at or before `end`, in wake order, then
    /// advance the clock to `end`.  Returns the number of callbacks run.
    pub fn run_until(&self, end: f64) -> usize {
        let mut fired = 0;
        loop {
            let taken = self.with(|q| {
                let (handle, wake) = q.next_due(end)?;
                q.now = q.now.max(wake);
                let cb = q.slot_of(handle)?.callback.take()?;
                Some((handle, wake, cb))
            });
            let Some((handle, wake, mut cb)) = taken else {
                break;
            };

            let outcome = cb(wake);
            fired += 1;

            self.with(|q| {
                let Some(slot) = q.slot_of(handle) else {
                    debug!("Reactor: timer {} cancelled during dispatch", handle.0);
                    return;
                };
                match outcome {
                    TickOutcome::Reschedule(next) if next > wake => {
                        slot.wake = next;
                        slot.callback = Some(cb);
                    }
                    TickOutcome::Reschedule(next) => {
                        warn!(
                            "Reactor: timer {} rescheduled backwards ({:.3} <= {:.3})",
                            handle.0, next, wake
                        );
                        let forced = wake + forward_step(wake);
                        if forced > wake {
                            slot.wake = forced;
                            slot.callback = Some(cb);
                        } else {
                            warn!("Reactor: timer {} cannot advance past {:.3}, dropping", handle.0, wake);
                            q.remove(handle);
                        }
                    }
                    TickOutcome::Cancel => {
                        q.remove(handle);
                    }
                }
            });
        }
        self.with(|q| q.now = q.now.max(end));
        fired
    }
}

impl TimerService for SimReactor {
    fn register(
        &mut self,
        callback: TimerCallback,
        first_wake: WakeTime,
    ) -> Result<TimerHandle, TimerError> {
        self.with(|q| {
            if q.closed {
                return Err(TimerError::Closed);
            }
            let wake = match first_wake {
                WakeTime::Now => q.now,
                WakeTime::At(t) => t,
            };
            let handle = TimerHandle(q.next_id);
            let free = q
                .slots
                .iter_mut()
                .find(|s| s.is_none())
                .ok_or(TimerError::NoFreeSlot)?;
            *free = Some(TimerSlot {
                handle,
                wake,
                callback: Some(callback),
            });
            q.next_id = q.next_id.wrapping_add(1);
            debug!("Reactor: timer {} armed for {:.3}", handle.0, wake);
            Ok(handle)
        })
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.with(|q| q.remove(handle)) {
            debug!("Reactor: timer {} cancelled", handle.0);
        }
    }
}
