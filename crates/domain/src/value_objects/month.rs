//! Month and weather value objects
//!
//! Months are only built by [`Calendar`](super::Calendar), which knows the
//! running day total needed for `start_day_of_year`. The `*Config` types are
//! the serializable descriptors months are built from and snapshot back to.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::units::Quantity;

// ============================================================================
// Configuration descriptors
// ============================================================================

/// Serializable descriptor for a single month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthConfig {
    /// Month name, unique (case-insensitively) within a calendar
    pub name: String,
    /// Number of days in this month (at least 1)
    pub days: u32,
    #[serde(default)]
    pub temperature: TemperatureConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl MonthConfig {
    /// Create a month descriptor with no temperature or weather data.
    pub fn new(name: impl Into<String>, days: u32) -> Self {
        Self {
            name: name.into(),
            days,
            temperature: TemperatureConfig::default(),
            weather: WeatherConfig::default(),
        }
    }

    pub fn with_temperature(mut self, min: impl Into<Quantity>, max: impl Into<Quantity>) -> Self {
        self.temperature = TemperatureConfig {
            min: min.into(),
            max: max.into(),
        };
        self
    }

    pub fn with_weather(mut self, weather: WeatherConfig) -> Self {
        self.weather = weather;
        self
    }
}

/// Temperature bounds; numbers are Fahrenheit, strings may use "C"/"F".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub min: Quantity,
    pub max: Quantity,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            min: Quantity::Number(0.0),
            max: Quantity::Number(0.0),
        }
    }
}

/// Weather profile descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub duration: DurationRangeConfig,
    #[serde(default)]
    pub types: Vec<WeatherTypeConfig>,
}

impl WeatherConfig {
    pub fn new(
        min: impl Into<Quantity>,
        max: impl Into<Quantity>,
        types: impl IntoIterator<Item = (&'static str, f64)>,
    ) -> Self {
        Self {
            duration: DurationRangeConfig {
                min: min.into(),
                max: max.into(),
            },
            types: types
                .into_iter()
                .map(|(kind, weight)| WeatherTypeConfig {
                    kind: kind.to_string(),
                    weight,
                })
                .collect(),
        }
    }
}

/// How long a weather spell lasts; numbers are minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationRangeConfig {
    pub min: Quantity,
    pub max: Quantity,
}

impl Default for DurationRangeConfig {
    fn default() -> Self {
        Self {
            min: Quantity::Number(0.0),
            max: Quantity::Number(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTypeConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: f64,
}

// ============================================================================
// TemperatureRange
// ============================================================================

/// Daily temperature bounds in degrees Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

// ============================================================================
// Weather
// ============================================================================

/// A weighted weather type (e.g., "rain" with weight 3)
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherType {
    name: String,
    weight: f64,
}

impl WeatherType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Weather profile of a month
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    min_duration: u64,
    max_duration: u64,
    types: Vec<WeatherType>,
    total_weight: f64,
}

impl Weather {
    pub(crate) fn from_config(config: &WeatherConfig, month: &str) -> Result<Self, DomainError> {
        let mut min_duration = whole_minutes(&config.duration.min, month)?;
        let mut max_duration = whole_minutes(&config.duration.max, month)?;
        if min_duration > max_duration {
            std::mem::swap(&mut min_duration, &mut max_duration);
        }

        let mut types = Vec::with_capacity(config.types.len());
        for entry in &config.types {
            if !(entry.weight.is_finite() && entry.weight > 0.0) {
                return Err(DomainError::validation(format!(
                    "Weather type '{}' in month '{}' must have a positive weight",
                    entry.kind, month
                )));
            }
            types.push(WeatherType {
                name: entry.kind.clone(),
                weight: entry.weight,
            });
        }
        let total_weight: f64 = types.iter().map(|t| t.weight).sum();
        if !total_weight.is_finite() {
            return Err(DomainError::validation(format!(
                "Weather weights in month '{}' add up to more than can be represented",
                month
            )));
        }

        Ok(Self {
            min_duration,
            max_duration,
            types,
            total_weight,
        })
    }

    /// Shortest weather spell, in minutes.
    pub fn min_duration(&self) -> u64 {
        self.min_duration
    }

    /// Longest weather spell, in minutes.
    pub fn max_duration(&self) -> u64 {
        self.max_duration
    }

    pub fn types(&self) -> &[WeatherType] {
        &self.types
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Pick a weather type with probability proportional to its weight.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Constraint` when there is nothing to pick from or
    /// the weights do not sum to a finite number.
    pub fn select_new_weather_type<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<&WeatherType, DomainError> {
        if self.types.is_empty() || self.total_weight <= 0.0 {
            return Err(DomainError::constraint(
                "Cannot select weather from an empty weather table",
            ));
        }
        if !self.total_weight.is_finite() {
            return Err(DomainError::constraint(format!(
                "Weather table total weight {} is not finite",
                self.total_weight
            )));
        }

        let mut remainder = rng.gen_range(0.0..self.total_weight);
        for weather_type in &self.types {
            remainder -= weather_type.weight;
            if remainder <= 0.0 {
                return Ok(weather_type);
            }
        }

        // Rounding in the weight sum can leave a sliver past the last entry.
        self.types
            .last()
            .ok_or_else(|| DomainError::constraint("Weather table emptied during selection"))
    }

    /// Roll how many minutes the next weather spell lasts.
    pub fn select_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min_duration..=self.max_duration)
    }

    pub fn config(&self) -> WeatherConfig {
        WeatherConfig {
            duration: DurationRangeConfig {
                min: Quantity::from(self.min_duration),
                max: Quantity::from(self.max_duration),
            },
            types: self
                .types
                .iter()
                .map(|t| WeatherTypeConfig {
                    kind: t.name.clone(),
                    weight: t.weight,
                })
                .collect(),
        }
    }
}

fn whole_minutes(quantity: &Quantity, month: &str) -> Result<u64, DomainError> {
    let minutes = quantity.as_minutes()?;
    if minutes < 0.0 {
        return Err(DomainError::validation(format!(
            "Weather duration in month '{}' cannot be negative",
            month
        )));
    }
    Ok(minutes.round() as u64)
}

// ============================================================================
// Month
// ============================================================================

/// A month of a configured calendar
#[derive(Debug, Clone, PartialEq)]
pub struct Month {
    name: String,
    start_day_of_year: u32,
    days: u32,
    temperature: TemperatureRange,
    weather: Weather,
}

impl Month {
    pub(crate) fn from_config(
        config: &MonthConfig,
        start_day_of_year: u32,
    ) -> Result<Self, DomainError> {
        if config.name.trim().is_empty() {
            return Err(DomainError::validation("Month name cannot be empty"));
        }
        if config.days == 0 {
            return Err(DomainError::validation(format!(
                "Month '{}' must have at least one day",
                config.name
            )));
        }

        Ok(Self {
            name: config.name.clone(),
            start_day_of_year,
            days: config.days,
            temperature: TemperatureRange {
                min: config.temperature.min.as_fahrenheit()?,
                max: config.temperature.max.as_fahrenheit()?,
            },
            weather: Weather::from_config(&config.weather, &config.name)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based day of the year this month starts on.
    pub fn start_day_of_year(&self) -> u32 {
        self.start_day_of_year
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Returns true when the 0-based day of year falls inside this month.
    pub fn contains_day_of_year(&self, day_of_year: u32) -> bool {
        day_of_year >= self.start_day_of_year && day_of_year < self.start_day_of_year + self.days
    }

    pub fn temperature(&self) -> TemperatureRange {
        self.temperature
    }

    pub fn weather(&self) -> &Weather {
        &self.weather
    }

    pub fn config(&self) -> MonthConfig {
        MonthConfig {
            name: self.name.clone(),
            days: self.days,
            temperature: TemperatureConfig {
                min: Quantity::Number(self.temperature.min),
                max: Quantity::Number(self.temperature.max),
            },
            weather: self.weather.config(),
        }
    }
}
