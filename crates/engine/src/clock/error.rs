//! Game clock error types.

use abduction_domain::DomainError;
use thiserror::Error;

use super::timer::TimerId;

/// Errors raised by the game clock and its timers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClockError {
    /// Configuration or date conversion failed in the domain layer.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The timeline cannot move while timers hold absolute trigger times.
    #[error("Cannot move the clock while {count} timer(s) are scheduled")]
    TimersPending { count: usize },

    /// The timer handle does not belong to this clock (or was dropped).
    #[error("Unknown timer: {0:?}")]
    UnknownTimer(TimerId),

    /// A scheduled timer was not where its trigger time says it is.
    #[error("Timer queue corrupted: {0}")]
    QueueCorrupted(String),
}

impl ClockError {
    pub fn queue_corrupted(msg: impl Into<String>) -> Self {
        Self::QueueCorrupted(msg.into())
    }
}
