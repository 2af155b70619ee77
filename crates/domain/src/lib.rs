//! Abduction domain: calendar, months, weather and unit-bearing quantities.
//!
//! Everything here is a pure value object. The engine crate layers the game
//! clock and timers on top.

pub mod error;
pub mod units;
pub mod value_objects;

pub use error::DomainError;

pub use units::{parse_duration_ms, parse_temperature_f, Quantity};

// Re-export value objects (explicit list in value_objects/mod.rs)
pub use value_objects::{
    Calendar, DurationRangeConfig, GameDate, Month, MonthConfig, MonthRef, NormalizedGameDate,
    TemperatureConfig, TemperatureRange, Weather, WeatherConfig, WeatherType, WeatherTypeConfig,
    HOURS_PER_DAY, MINUTES_PER_DAY, MINUTES_PER_HOUR,
};
