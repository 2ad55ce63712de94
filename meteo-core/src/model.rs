use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// One weather condition attached to a forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    /// OpenWeatherMap condition id, e.g. 500 for light rain.
    pub code: i32,
    pub label: String,
}

/// A single 3-hour forecast data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Epoch seconds, UTC.
    pub timestamp: i64,
    /// Kelvin.
    pub temperature: f64,
    pub conditions: Vec<WeatherCondition>,
}

impl ForecastSample {
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature - KELVIN_OFFSET
    }

    /// The condition listed first by upstream.
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.conditions.first()
    }

    pub fn condition_codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.conditions.iter().map(|c| c.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleStatus {
    Ok,
    NotFound,
    /// Any other upstream status, carrying the raw `cod`.
    Error(String),
}

/// A full forecast as returned by upstream, samples in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBundle {
    pub status: BundleStatus,
    pub samples: Vec<ForecastSample>,
}

impl ForecastBundle {
    pub fn not_found() -> Self {
        Self {
            status: BundleStatus::NotFound,
            samples: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == BundleStatus::Ok
    }
}

/// Time requested by the dialogue layer, decoded once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedTime {
    Instant(DateTime<FixedOffset>),
    Interval {
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    },
}

impl RequestedTime {
    /// Collapse the request into the single instant used for slot matching.
    ///
    /// Intervals start one hour after their `from` bound so an interval
    /// beginning at midnight is not mistaken for a bare day. A bare day
    /// (local 00:00:00) is moved to noon.
    pub fn instant(&self) -> DateTime<Utc> {
        let mut at = match *self {
            RequestedTime::Instant(at) => at,
            RequestedTime::Interval { from, .. } => from + Duration::hours(1),
        };

        if at.time() == NaiveTime::MIN {
            at += Duration::hours(12);
        }

        at.with_timezone(&Utc)
    }
}

/// Requested instant for an optional request; absent means "now".
pub fn requested_instant(requested: Option<&RequestedTime>, now: DateTime<Utc>) -> DateTime<Utc> {
    requested.map_or(now, RequestedTime::instant)
}

/// Parse the dialogue platform's `YYYY-MM-DD HH:MM:SS +HH:MM` timestamps.
pub fn parse_dialogue_time(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %:z")
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z"))
        .map_err(|e| ForecastError::InvalidTime(format!("'{value}': {e}")))
}
