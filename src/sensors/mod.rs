//! Sensor subsystem.
//!
//! Only one sensor matters to the feed: the pellet presence sensor in
//! the feed chute.  Raw edges arrive from the sensor watcher's own
//! execution context; [`pellet::PelletDebouncer`] decides which of them
//! are allowed to trigger a blower recompute.

pub mod pellet;
