//! Pellet-feed controller library.
//!
//! Drives a pneumatic pellet feeder (a blower pushing air through a
//! feed tube and an auger pump metering pellets into it) in lock-step
//! with upcoming printer movement.  A presence sensor at the end of the
//! tube throttles the blower down once pellets have arrived and back up
//! once they have drained.
//!
//! The controller core ([`app::service::FeedController`]) is pure logic
//! behind port traits; [`adapters`] provides `embedded-hal` channels, a
//! virtual-time timer reactor and a pin registry for host simulation.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod sensors;

pub use app::commands::LifecycleEvent;
pub use app::events::FeedStatus;
pub use app::service::{FeedController, FeedPorts};
pub use config::FeedConfig;
pub use error::{Error, Result};
pub use fsm::{FeedPhase, TickOutcome};
pub use sensors::pellet::SensorState;
