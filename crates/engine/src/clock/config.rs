//! Clock configuration
//!
//! `ClockConfig` is the serializable shape accepted by
//! [`GameClock::new`](super::GameClock::new) and
//! [`GameClock::configure`](super::GameClock::configure), and produced by
//! [`GameClock::config`](super::GameClock::config).
//!
//! ```json
//! {
//!   "calendar": [{ "name": "Frostfall", "days": 30 }],
//!   "tickDelays": { "normal": "4s", "fast": 16 },
//!   "tickDelay": "fast",
//!   "current": { "year": 3, "month": "frostfall", "day": 1, "hour": 6, "minute": 0 },
//!   "hourlyTemperatureAdjustment": [-8, -9, -10]
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use abduction_domain::{
    Calendar, DomainError, GameDate, MonthConfig, Quantity, HOURS_PER_DAY,
};
use serde::{Deserialize, Serialize};

/// Hours in the temperature adjustment table
pub const ADJUSTMENT_HOURS: usize = HOURS_PER_DAY as usize;

/// Default hourly temperature offsets (°F): coldest before dawn, warmest mid-afternoon.
const DIURNAL_ADJUSTMENT: [f64; ADJUSTMENT_HOURS] = [
    -8.0, -9.0, -10.0, -10.0, -9.0, -8.0, -6.0, -4.0, -2.0, 0.0, 2.0, 4.0, 6.0, 7.0, 8.0, 8.0,
    7.0, 6.0, 4.0, 2.0, 0.0, -2.0, -4.0, -6.0,
];

// =============================================================================
// Tick modes
// =============================================================================

/// Named tick rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickMode {
    Paused,
    Normal,
    Fast,
}

impl TickMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickMode::Paused => "paused",
            TickMode::Normal => "normal",
            TickMode::Fast => "fast",
        }
    }
}

impl fmt::Display for TickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TickMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paused" => Ok(TickMode::Paused),
            "normal" => Ok(TickMode::Normal),
            "fast" => Ok(TickMode::Fast),
            other => Err(DomainError::parse(format!("Unknown tick mode '{}'", other))),
        }
    }
}

/// Real milliseconds per game minute for each named mode. 0 never advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDelays {
    pub paused: u64,
    pub normal: u64,
    pub fast: u64,
}

impl Default for TickDelays {
    fn default() -> Self {
        Self {
            paused: 0,
            normal: 4000,
            fast: 16,
        }
    }
}

impl TickDelays {
    pub fn get(&self, mode: TickMode) -> u64 {
        match mode {
            TickMode::Paused => self.paused,
            TickMode::Normal => self.normal,
            TickMode::Fast => self.fast,
        }
    }

    /// The named mode running at `delay`, if any.
    pub fn mode_of(&self, delay: u64) -> Option<TickMode> {
        [TickMode::Paused, TickMode::Normal, TickMode::Fast]
            .into_iter()
            .find(|mode| self.get(*mode) == delay)
    }
}

/// Tick delay overrides; missing entries keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickDelaysConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast: Option<Quantity>,
}

impl TickDelaysConfig {
    fn resolve(&self) -> Result<TickDelays, DomainError> {
        let defaults = TickDelays::default();
        let pick = |value: &Option<Quantity>, fallback: u64| match value {
            Some(quantity) => millis(quantity),
            None => Ok(fallback),
        };
        Ok(TickDelays {
            paused: pick(&self.paused, defaults.paused)?,
            normal: pick(&self.normal, defaults.normal)?,
            fast: pick(&self.fast, defaults.fast)?,
        })
    }
}

impl From<TickDelays> for TickDelaysConfig {
    fn from(delays: TickDelays) -> Self {
        Self {
            paused: Some(delays.paused.into()),
            normal: Some(delays.normal.into()),
            fast: Some(delays.fast.into()),
        }
    }
}

// =============================================================================
// ClockConfig
// =============================================================================

/// Starting point of the timeline: a raw timestamp or a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurrentConfig {
    Timestamp(u64),
    Date(GameDate),
}

impl Default for CurrentConfig {
    fn default() -> Self {
        CurrentConfig::Timestamp(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClockConfig {
    pub calendar: Vec<MonthConfig>,
    pub tick_delays: TickDelaysConfig,
    /// A mode name ("fast"), milliseconds, or a duration string ("250ms")
    pub tick_delay: Quantity,
    pub current: CurrentConfig,
    /// Temperature offset (°F) per hour; padded with 0 or truncated to 24
    pub hourly_temperature_adjustment: Vec<f64>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            calendar: Calendar::standard().config(),
            tick_delays: TickDelaysConfig::default(),
            tick_delay: Quantity::Text(TickMode::Normal.as_str().to_string()),
            current: CurrentConfig::default(),
            hourly_temperature_adjustment: DIURNAL_ADJUSTMENT.to_vec(),
        }
    }
}

/// A fully validated configuration, ready to install on a clock.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub calendar: Calendar,
    pub tick_delays: TickDelays,
    pub tick_delay: u64,
    pub current: u64,
    pub hourly_adjustment: [f64; ADJUSTMENT_HOURS],
}

impl ClockConfig {
    /// Validate every field without touching any clock.
    pub(crate) fn resolve(&self) -> Result<ResolvedConfig, DomainError> {
        let calendar = Calendar::new(&self.calendar)?;
        let tick_delays = self.tick_delays.resolve()?;

        let tick_delay = match &self.tick_delay {
            Quantity::Text(text) => match text.parse::<TickMode>() {
                Ok(mode) => tick_delays.get(mode),
                Err(_) => millis(&self.tick_delay)?,
            },
            number => millis(number)?,
        };

        let current = match &self.current {
            CurrentConfig::Timestamp(timestamp) => *timestamp,
            CurrentConfig::Date(date) => calendar.date_to_timestamp(date)?,
        };

        let mut hourly_adjustment = [0.0; ADJUSTMENT_HOURS];
        for (hour, (slot, value)) in hourly_adjustment
            .iter_mut()
            .zip(&self.hourly_temperature_adjustment)
            .enumerate()
        {
            if !value.is_finite() {
                return Err(DomainError::validation(format!(
                    "Hourly temperature adjustment for hour {} is not a number",
                    hour
                )));
            }
            *slot = *value;
        }

        Ok(ResolvedConfig {
            calendar,
            tick_delays,
            tick_delay,
            current,
            hourly_adjustment,
        })
    }
}

/// A non-negative millisecond quantity, rounded to whole milliseconds.
fn millis(quantity: &Quantity) -> Result<u64, DomainError> {
    let value = quantity.as_millis()?;
    if value < 0.0 {
        return Err(DomainError::validation(format!(
            "Tick delay '{}' is negative",
            quantity
        )));
    }
    Ok(value.round() as u64)
}
