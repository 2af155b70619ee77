//! Shared helpers for clock tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{recorder, short_clock};
//!
//! #[test]
//! fn fires_once() {
//!     let (mut clock, wall) = short_clock();
//!     wall.advance(4000);
//!     clock.update().unwrap();
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use abduction_domain::MonthConfig;

use crate::clock::{ClockConfig, GameClock};
use crate::infrastructure::clock::SteppedClock;

/// Ordered log of what listeners saw.
pub type Recorder = Rc<RefCell<Vec<String>>>;

pub fn recorder() -> Recorder {
    Rc::new(RefCell::new(Vec::new()))
}

// =============================================================================
// Clocks
// =============================================================================

/// Two months, A (2 days) and B (3 days), starting at the epoch in normal mode.
pub fn short_config() -> ClockConfig {
    ClockConfig {
        calendar: vec![MonthConfig::new("A", 2), MonthConfig::new("B", 3)],
        ..ClockConfig::default()
    }
}

/// A clock on [`short_config`] driven by a hand-stepped wall clock.
///
/// # Panics
///
/// Panics if the fixture configuration is invalid.
pub fn short_clock() -> (GameClock, Arc<SteppedClock>) {
    let wall = Arc::new(SteppedClock::default());
    let clock = GameClock::new(&short_config(), wall.clone())
        .unwrap_or_else(|e| panic!("Failed to build fixture clock: {}", e));
    (clock, wall)
}
