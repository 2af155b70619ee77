//! Calendar system value objects
//!
//! A calendar is an ordered list of months laid over a flat timeline of
//! minutes. Timestamp 0 is 00:00 on day 1 of the first month of year 0.
//!
//! Key types:
//! - `Calendar` - Ordered months with derived day-of-year offsets
//! - `GameDate` - Date input whose components may overflow (minute = 125)
//! - `NormalizedGameDate` - Canonical date output with its timestamp
//! - `MonthRef` - A month addressed by index or case-insensitive name

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::month::{Month, MonthConfig, WeatherConfig};
use crate::error::DomainError;

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY;

// ============================================================================
// MonthRef
// ============================================================================

/// A month addressed by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonthRef {
    Index(usize),
    Name(String),
}

impl From<usize> for MonthRef {
    fn from(index: usize) -> Self {
        MonthRef::Index(index)
    }
}

impl From<&str> for MonthRef {
    fn from(name: &str) -> Self {
        MonthRef::Name(name.to_string())
    }
}

impl From<String> for MonthRef {
    fn from(name: String) -> Self {
        MonthRef::Name(name)
    }
}

impl From<&Month> for MonthRef {
    fn from(month: &Month) -> Self {
        MonthRef::Name(month.name().to_string())
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthRef::Index(index) => write!(f, "#{}", index),
            MonthRef::Name(name) => write!(f, "{}", name),
        }
    }
}

// ============================================================================
// GameDate
// ============================================================================

/// A structured date as supplied by callers.
///
/// Components are signed and unbounded so that "minute 125" or "day 0" can be
/// normalized through the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDate {
    pub year: i64,
    pub month: MonthRef,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
}

impl GameDate {
    pub fn new(year: i64, month: impl Into<MonthRef>, day: i64, hour: i64, minute: i64) -> Self {
        Self {
            year,
            month: month.into(),
            day,
            hour,
            minute,
        }
    }
}

impl From<&NormalizedGameDate> for GameDate {
    fn from(date: &NormalizedGameDate) -> Self {
        Self {
            year: date.year as i64,
            month: MonthRef::Index(date.month),
            day: date.day as i64,
            hour: date.hour as i64,
            minute: date.minute as i64,
        }
    }
}

// ============================================================================
// NormalizedGameDate
// ============================================================================

/// Canonical date with every component in range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedGameDate {
    pub year: u64,
    /// Month index (0-based)
    pub month: usize,
    /// Name of the resolved month
    pub month_name: String,
    /// Day of month (1-based)
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Minutes since epoch
    pub timestamp: u64,
}

impl fmt::Display for NormalizedGameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} of day {} in the month of {} in year {} since abduction.",
            self.hour, self.minute, self.day, self.month_name, self.year
        )
    }
}

// ============================================================================
// Calendar
// ============================================================================

/// Ordered months with precomputed day-of-year offsets
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    months: Vec<Month>,
    days_in_year: u32,
    /// Lower-cased month name -> index
    index_by_name: HashMap<String, usize>,
}

impl Calendar {
    /// Build a calendar from month descriptors.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - A month name is empty
    /// - Two month names are equal ignoring case
    /// - A month has zero days, or the year has zero days
    ///
    /// and `DomainError::Parse` for malformed temperature or duration strings.
    pub fn new(configs: &[MonthConfig]) -> Result<Self, DomainError> {
        let mut months = Vec::with_capacity(configs.len());
        let mut index_by_name = HashMap::with_capacity(configs.len());
        let mut days_in_year: u32 = 0;

        for (index, config) in configs.iter().enumerate() {
            let month = Month::from_config(config, days_in_year)?;
            if index_by_name
                .insert(month.name().to_lowercase(), index)
                .is_some()
            {
                return Err(DomainError::validation(format!(
                    "Duplicate month name '{}'",
                    month.name()
                )));
            }
            days_in_year = days_in_year.checked_add(month.days()).ok_or_else(|| {
                DomainError::validation("Calendar year has too many days")
            })?;
            months.push(month);
        }

        if days_in_year == 0 {
            return Err(DomainError::validation(
                "Calendar must contain at least one day",
            ));
        }

        Ok(Self {
            months,
            days_in_year,
            index_by_name,
        })
    }

    /// Replace this calendar's months. Leaves the calendar untouched on error.
    pub fn configure(&mut self, configs: &[MonthConfig]) -> Result<(), DomainError> {
        *self = Self::new(configs)?;
        Ok(())
    }

    /// The built-in twelve month calendar with temperate weather.
    pub fn standard() -> Self {
        Self::new(&standard_months()).expect("standard calendar is valid")
    }

    // Accessors

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn days_in_year(&self) -> u32 {
        self.days_in_year
    }

    pub fn minutes_per_year(&self) -> u64 {
        self.days_in_year as u64 * MINUTES_PER_DAY
    }

    /// Resolve a month by index or case-insensitive name.
    pub fn month(&self, month: impl Into<MonthRef>) -> Option<&Month> {
        self.month_index(&month.into()).map(|index| &self.months[index])
    }

    pub fn month_index(&self, month: &MonthRef) -> Option<usize> {
        match month {
            MonthRef::Index(index) => (*index < self.months.len()).then_some(*index),
            MonthRef::Name(name) => self.index_by_name.get(&name.to_lowercase()).copied(),
        }
    }

    // Conversions

    /// Convert minutes since epoch into a calendar date.
    pub fn timestamp_to_date(&self, timestamp: u64) -> NormalizedGameDate {
        let minute = (timestamp % MINUTES_PER_HOUR) as u32;
        let hours = timestamp / MINUTES_PER_HOUR;
        let hour = (hours % HOURS_PER_DAY) as u32;
        let days = hours / HOURS_PER_DAY;

        let days_in_year = self.days_in_year as u64;
        let year = days / days_in_year;
        let day_of_year = (days % days_in_year) as u32;

        let month = self
            .months
            .iter()
            .position(|m| m.contains_day_of_year(day_of_year))
            .unwrap_or(self.months.len() - 1);
        let entry = &self.months[month];

        NormalizedGameDate {
            year,
            month,
            month_name: entry.name().to_string(),
            day: day_of_year - entry.start_day_of_year() + 1,
            hour,
            minute,
            timestamp,
        }
    }

    /// Convert a date into minutes since epoch, carrying overflowed components.
    ///
    /// # Errors
    ///
    /// - `DomainError::NotFound` if the month does not resolve
    /// - `DomainError::Validation` if the date lies before the epoch
    pub fn date_to_timestamp(&self, date: &GameDate) -> Result<u64, DomainError> {
        let index = self
            .month_index(&date.month)
            .ok_or_else(|| DomainError::not_found("Month", date.month.to_string()))?;
        let month = &self.months[index];

        let days = date.year as i128 * self.days_in_year as i128
            + month.start_day_of_year() as i128
            + date.day as i128
            - 1;
        let minutes = ((days * HOURS_PER_DAY as i128) + date.hour as i128)
            * MINUTES_PER_HOUR as i128
            + date.minute as i128;

        u64::try_from(minutes).map_err(|_| {
            DomainError::validation(format!("Date {:?} lies outside the timeline", date))
        })
    }

    /// Canonicalize out-of-range components (minute 125 becomes 2:05).
    pub fn normalize_date(&self, date: &GameDate) -> Result<NormalizedGameDate, DomainError> {
        Ok(self.timestamp_to_date(self.date_to_timestamp(date)?))
    }

    /// Render a date as "HH:MM of day D in the month of NAME in year Y since abduction."
    pub fn date_to_string(&self, date: &GameDate) -> Result<String, DomainError> {
        Ok(self.normalize_date(date)?.to_string())
    }

    pub fn config(&self) -> Vec<MonthConfig> {
        self.months.iter().map(Month::config).collect()
    }
}

fn standard_months() -> Vec<MonthConfig> {
    let winter = || {
        WeatherConfig::new(
            "6h",
            "2d",
            [("clear", 2.0), ("overcast", 3.0), ("snow", 4.0), ("blizzard", 1.0)],
        )
    };
    let spring = || {
        WeatherConfig::new(
            "4h",
            "1d",
            [("clear", 3.0), ("overcast", 2.0), ("rain", 4.0), ("thunderstorm", 1.0)],
        )
    };
    let summer = || {
        WeatherConfig::new(
            "8h",
            "3d",
            [("clear", 6.0), ("overcast", 1.0), ("rain", 1.0), ("thunderstorm", 2.0)],
        )
    };
    let autumn = || {
        WeatherConfig::new(
            "4h",
            "1d",
            [("clear", 2.0), ("overcast", 3.0), ("rain", 3.0), ("fog", 2.0)],
        )
    };

    vec![
        MonthConfig::new("January", 31).with_temperature(20.0, 36.0).with_weather(winter()),
        MonthConfig::new("February", 28).with_temperature(23.0, 40.0).with_weather(winter()),
        MonthConfig::new("March", 31).with_temperature(31.0, 50.0).with_weather(spring()),
        MonthConfig::new("April", 30).with_temperature(41.0, 61.0).with_weather(spring()),
        MonthConfig::new("May", 31).with_temperature(51.0, 71.0).with_weather(spring()),
        MonthConfig::new("June", 30).with_temperature(60.0, 80.0).with_weather(summer()),
        MonthConfig::new("July", 31).with_temperature(65.0, 85.0).with_weather(summer()),
        MonthConfig::new("August", 31).with_temperature(64.0, 83.0).with_weather(summer()),
        MonthConfig::new("September", 30).with_temperature(56.0, 76.0).with_weather(autumn()),
        MonthConfig::new("October", 31).with_temperature(45.0, 64.0).with_weather(autumn()),
        MonthConfig::new("November", 30).with_temperature(36.0, 52.0).with_weather(autumn()),
        MonthConfig::new("December", 31).with_temperature(26.0, 40.0).with_weather(winter()),
    ]
}

// ============================================================================
// Tests
// ============================================================================
