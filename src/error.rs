//! Unified error types for the feed controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! construction path and the movement entry point report failures the
//! same way.  Runtime callbacks (sensor edges, ticks) never fail; only
//! configuration, pin resolution and timer registration can.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration is invalid.  Always fatal at construction.
    Config(ConfigError),
    /// A pin name could not be resolved or claimed.
    Pin(PinError),
    /// The timer service refused a registration.
    Timer(TimerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Pin(e) => write!(f, "pin: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A timing constant must be finite and strictly positive.
    NotPositive { field: &'static str, value: f64 },
    /// A value is finite but outside its permitted range.
    OutOfRange { field: &'static str, value: f64 },
    /// A pin name is empty.
    EmptyPin(&'static str),
    /// The config document could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be above 0 (got {value})")
            }
            Self::OutOfRange { field, value } => write!(f, "{field} out of range (got {value})"),
            Self::EmptyPin(field) => write!(f, "{field} is empty"),
            Self::Parse(msg) => write!(f, "parse failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Pin errors
// ---------------------------------------------------------------------------

/// The three kinds of channel the controller asks the pin factory for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    ContinuousOutput,
    BinaryOutput,
    PresenceSensor,
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinuousOutput => write!(f, "continuous output"),
            Self::BinaryOutput => write!(f, "binary output"),
            Self::PresenceSensor => write!(f, "presence sensor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    /// No pin with this name exists.
    Unknown(String),
    /// The pin exists but was already handed out.
    AlreadyClaimed(String),
    /// The pin exists but cannot act as the requested kind.
    WrongKind { name: String, kind: PinKind },
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown pin '{name}'"),
            Self::AlreadyClaimed(name) => write!(f, "pin '{name}' already in use"),
            Self::WrongKind { name, kind } => write!(f, "pin '{name}' cannot be a {kind}"),
        }
    }
}

impl From<PinError> for Error {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Every timer slot is occupied.
    NoFreeSlot,
    /// The service has shut down and accepts no new timers.
    Closed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFreeSlot => write!(f, "no free timer slot"),
            Self::Closed => write!(f, "timer service closed"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
