//! Infrastructure: wall-clock and randomness ports and their implementations.

pub mod clock;
pub mod ports;
