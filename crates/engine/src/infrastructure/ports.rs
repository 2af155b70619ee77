//! Port traits for dependencies the clock does not own.

// =============================================================================
// Testability Ports
// =============================================================================

/// Wall-clock abstraction for the host polling loop
///
/// The game clock never reads real time directly; it asks this port, so tests
/// can step time by hand.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    /// Milliseconds on a monotonic clock. Only differences are meaningful.
    fn now_millis(&self) -> u64;
}

/// Randomness abstraction for weather rolls and other host-side draws
///
/// Hands out seeds rather than values; callers build a short-lived generator
/// from each seed.
#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    fn next_seed(&self) -> u64;
}
