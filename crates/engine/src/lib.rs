//! Abduction Engine library.
//!
//! Virtual game time for the host loop: a minute-granular clock layered on the
//! calendar from `abduction-domain`, one-shot and repeating timers, and
//! rollover events.
//!
//! ## Structure
//!
//! - `clock/` - `GameClock`, timers, timer queue, events, configuration
//! - `infrastructure/` - Wall-clock and randomness ports and their implementations

pub mod clock;
pub mod infrastructure;

/// Test fixtures shared by unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use clock::{
    ClockConfig, ClockError, ClockEvent, CurrentConfig, GameClock, GameTimer, Listener,
    RolloverKind, SubscriptionId, TickDelays, TickDelaysConfig, TickMode, TimerId, TimerOptions,
};
pub use infrastructure::clock::{SeededRandom, SystemClock, SystemRandom};
pub use infrastructure::ports::{ClockPort, RandomPort};
