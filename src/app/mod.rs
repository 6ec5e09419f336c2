//! Application core: the feed controller and its port boundary.
//!
//! The business rules live in [`service::FeedController`]; everything it
//! talks to is behind a trait in [`ports`], so the controller runs on the
//! host against mocks with no real channels or timers.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
