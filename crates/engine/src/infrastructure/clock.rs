//! Wall clock and randomness implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::infrastructure::ports::{ClockPort, RandomPort};

/// System clock - monotonic real time since construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// System randomness - a fresh seed from the thread-local generator.
#[derive(Debug, Default)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn next_seed(&self) -> u64 {
        rand::random()
    }
}

/// Reproducible randomness: seeds count up from a starting value.
#[derive(Debug)]
pub struct SeededRandom(AtomicU64);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(AtomicU64::new(seed))
    }
}

impl RandomPort for SeededRandom {
    fn next_seed(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Hand-stepped clock for testing.
#[cfg(test)]
#[derive(Default)]
pub struct SteppedClock(AtomicU64);

#[cfg(test)]
impl SteppedClock {
    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl ClockPort for SteppedClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockRandomPort;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(second >= first);
    }

    #[test]
    fn stepped_clock_advances() {
        let clock = SteppedClock::default();
        clock.advance(40);
        clock.advance(2);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn seeded_random_counts_up() {
        let random = SeededRandom::new(41);
        assert_eq!(random.next_seed(), 41);
        assert_eq!(random.next_seed(), 42);
    }

    #[test]
    fn same_seed_rolls_same_weather() {
        use abduction_domain::{Calendar, MonthConfig, WeatherConfig};
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let config = MonthConfig::new("Spring", 30).with_weather(WeatherConfig::new(
            10.0,
            90.0,
            [("rain", 2.0), ("sun", 3.0), ("fog", 1.0)],
        ));
        let calendar = Calendar::new(&[config]).unwrap();
        let weather = calendar.month(0).unwrap().weather();
        let roll = |random: &dyn RandomPort| {
            let mut rng = StdRng::seed_from_u64(random.next_seed());
            let kind = weather.select_new_weather_type(&mut rng).unwrap();
            (kind.name().to_string(), weather.select_duration(&mut rng))
        };

        let mut mock = MockRandomPort::new();
        mock.expect_next_seed().times(2).return_const(7u64);
        assert_eq!(roll(&mock), roll(&mock));
        assert_eq!(roll(&SeededRandom::new(7)), roll(&SeededRandom::new(7)));
    }
}
