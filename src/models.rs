//! Wire schema shared by the aggregation route and the dashboard client.
//!
//! These types are the sole contract between the two sides: the route
//! serializes a [`WeatherDocument`] and the dashboard deserializes it back.
//! Field names follow the open-meteo-style convention the dashboard renders
//! (`temperature_2m_max`, `relative_humidity_2m`, ...), so the JSON shape is
//! part of the contract and must not drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized weather document for one city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherDocument {
    /// Display name: the requested city name, or the provider's returned name
    /// when the request was already in provider format.
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_weather: CurrentWeather,
    pub daily: DailySeries,
    pub hourly: HourlySeries,
}

/// Current conditions, derived once per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Temperature in °C.
    pub temperature: f64,
    /// Internal condition code (see `conditions`).
    pub weathercode: u8,
    /// Wind speed in km/h, converted from the provider's m/s.
    pub windspeed: f64,
    /// Wind direction in degrees; 0 when the provider omits it.
    pub winddirection: i64,
    /// Observation timestamp.
    pub time: DateTime<Utc>,
}

/// Seven parallel day slots, index 0 is always today from current conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySeries {
    pub time: Vec<DateTime<Utc>>,
    pub weathercode: Vec<u8>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
}

/// Twenty-four parallel hour slots, index 0 is always "now".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<DateTime<Utc>>,
    pub temperature_2m: Vec<f64>,
    pub relative_humidity_2m: Vec<i64>,
    pub weathercode: Vec<u8>,
}

impl DailySeries {
    /// Number of populated slots. The series is index-aligned, so all four
    /// sequences share this length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

impl HourlySeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
