//! Inbound lifecycle events.
//!
//! Raised by the host's printer/idle lifecycle and handed to
//! [`FeedController::handle_lifecycle`](super::service::FeedController::handle_lifecycle).
//! Every one of them stops the feed; there is no idle deadline of the
//! controller's own.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The host is restarting; outputs must go quiet.
    RestartRequested,
    /// The idle timeout expired.
    IdleBegin,
    /// The host left the idle state (e.g. after a reset).
    IdleEnd,
}

impl LifecycleEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::RestartRequested => "restart-requested",
            Self::IdleBegin => "idle-begin",
            Self::IdleEnd => "idle-end",
        }
    }
}
