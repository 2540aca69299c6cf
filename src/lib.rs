//! Weatherboard - weather dashboard service and terminal display.
//!
//! This library provides the aggregation route that normalizes OpenWeatherMap
//! data into a fixed 7-day / 24-hour dashboard document, the HTTP boundary
//! serving it, and the terminal client rendering it.

use std::sync::LazyLock;

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod cities;
pub mod conditions;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod openweather;
pub mod web;

// Re-export core types for public API
pub use error::{Leg, WeatherError};
pub use models::{CurrentWeather, DailySeries, HourlySeries, WeatherDocument};
pub use openweather::OpenWeatherClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;

/// Shared HTTP client for all outbound requests.
pub static API_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("weatherboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
