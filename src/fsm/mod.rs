//! Feed state machine.
//!
//! ```text
//!            start_feeding
//!   IDLE ────────────────────▶ FEEDING ──┐
//!    ▲                           │  ▲    │ tick (level only)
//!    └───────────────────────────┘  └────┘
//!            stop_feeding
//! ```
//!
//! There is no terminal state.  `tick` never changes the phase; it only
//! decides whether the blower level needs re-issuing.  The transition
//! handlers in [`states`] are pure: they mutate [`context::FeedState`]
//! and tell the caller which actuator and timer calls to make, so the
//! controller can run them inside its critical section.

pub mod context;
pub mod states;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    Idle,
    Feeding,
}

impl FeedPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Feeding => "Feeding",
        }
    }
}

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// What a timer callback asks of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Fire again at this absolute event time.
    Reschedule(f64),
    /// Unregister; never fire again.
    Cancel,
}
