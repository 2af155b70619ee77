//! Unit-bearing quantities used by clock and calendar configuration
//!
//! Configuration files may give durations and temperatures either as plain
//! numbers or as strings like "90m", "8h", "1d 2h", "20C" or "68F". Tokens are
//! case-insensitive and summable. A bare number is taken in the caller's base
//! unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

/// A configuration value that is either a number or a unit string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Quantity {
    /// Duration in real milliseconds. Bare numbers are milliseconds.
    pub fn as_millis(&self) -> Result<f64, DomainError> {
        match self {
            Quantity::Number(n) => finite(*n),
            Quantity::Text(s) => parse_duration_ms(s, 1.0),
        }
    }

    /// Duration in minutes. Bare numbers are minutes.
    pub fn as_minutes(&self) -> Result<f64, DomainError> {
        match self {
            Quantity::Number(n) => finite(*n),
            Quantity::Text(s) => Ok(parse_duration_ms(s, MS_PER_MINUTE)? / MS_PER_MINUTE),
        }
    }

    /// Temperature in degrees Fahrenheit. Bare numbers are Fahrenheit.
    pub fn as_fahrenheit(&self) -> Result<f64, DomainError> {
        match self {
            Quantity::Number(n) => finite(*n),
            Quantity::Text(s) => parse_temperature_f(s),
        }
    }
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::Number(value)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Quantity::Number(value as f64)
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Quantity::Text(value.to_string())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Number(n) => write!(f, "{}", n),
            Quantity::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a summable duration string into milliseconds.
///
/// `bare_unit_ms` is the scale applied to tokens without a unit.
pub fn parse_duration_ms(input: &str, bare_unit_ms: f64) -> Result<f64, DomainError> {
    let mut total = 0.0;
    for (value, unit) in tokenize(input)? {
        let scale = match unit.as_str() {
            "" => bare_unit_ms,
            "ms" => 1.0,
            "s" | "sec" | "secs" | "second" | "seconds" => MS_PER_SECOND,
            "m" | "min" | "mins" | "minute" | "minutes" => MS_PER_MINUTE,
            "h" | "hr" | "hrs" | "hour" | "hours" => MS_PER_HOUR,
            "d" | "day" | "days" => MS_PER_DAY,
            other => {
                return Err(DomainError::parse(format!(
                    "Unknown duration unit '{}' in '{}'",
                    other, input
                )))
            }
        };
        total += value * scale;
    }
    finite(total)
}

/// Parse a summable temperature string into degrees Fahrenheit.
pub fn parse_temperature_f(input: &str) -> Result<f64, DomainError> {
    let mut total = 0.0;
    for (value, unit) in tokenize(input)? {
        total += match unit.as_str() {
            "" | "f" | "°f" => value,
            "c" | "°c" => value * 9.0 / 5.0 + 32.0,
            other => {
                return Err(DomainError::parse(format!(
                    "Unknown temperature unit '{}' in '{}'",
                    other, input
                )))
            }
        };
    }
    finite(total)
}

fn finite(value: f64) -> Result<f64, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::parse(format!("Non-finite quantity: {}", value)))
    }
}

/// Split "1d 2h", "1d2h" or "-5 c" into (number, lower-cased unit) pairs.
fn tokenize(input: &str) -> Result<Vec<(f64, String)>, DomainError> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(DomainError::parse("Empty quantity"));
    }

    let mut tokens = Vec::new();
    let mut chars = normalized.chars().peekable();
    loop {
        while chars.next_if(|c: &char| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut number = String::new();
        while let Some(c) =
            chars.next_if(|c: &char| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        {
            number.push(c);
        }
        while chars.next_if(|c: &char| c.is_whitespace()).is_some() {}
        let mut unit = String::new();
        while let Some(c) = chars.next_if(|c: &char| c.is_alphabetic() || *c == '°') {
            unit.push(c);
        }

        if number.is_empty() {
            return Err(DomainError::parse(format!(
                "Expected a number before '{}' in '{}'",
                unit, input
            )));
        }
        let value: f64 = number.parse().map_err(|_| {
            DomainError::parse(format!("Invalid number '{}' in '{}'", number, input))
        })?;
        tokens.push((value, unit));
    }
    Ok(tokens)
}
