//! Value objects - Immutable objects defined by their attributes

mod calendar;
mod month;

pub use calendar::{
    Calendar, GameDate, MonthRef, NormalizedGameDate, HOURS_PER_DAY, MINUTES_PER_DAY,
    MINUTES_PER_HOUR,
};
pub use month::{
    DurationRangeConfig, Month, MonthConfig, TemperatureConfig, TemperatureRange, Weather,
    WeatherConfig, WeatherType, WeatherTypeConfig,
};
