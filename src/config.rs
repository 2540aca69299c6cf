//! Runtime configuration.
//!
//! The provider credential is deliberately read from the environment on every
//! request rather than cached at startup: a misconfigured deployment fails
//! each request with a descriptive diagnostic instead of crashing at boot,
//! and late-injected configuration is picked up without a restart.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::WeatherError;

/// City used when the inbound request omits `?city=`.
pub const DEFAULT_CITY: &str = "深圳";

/// Shared budget for both upstream requests; elapsing it abandons both legs.
pub const UPSTREAM_BUDGET: Duration = Duration::from_secs(15);

/// Dashboard-side budget per service call, distinct from the upstream budget.
pub const DISPLAY_TIMEOUT: Duration = Duration::from_secs(10);

/// How long successful upstream payloads stay cached.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

/// Read the provider credential. Called once per request.
pub fn api_key() -> Result<String, WeatherError> {
    api_key_from(env::var(API_KEY_VAR).ok())
}

fn api_key_from(raw: Option<String>) -> Result<String, WeatherError> {
    match raw {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(WeatherError::config(format!(
            "{API_KEY_VAR} is not set. Export the variable with your OpenWeatherMap \
             API key (https://openweathermap.org/api_keys) and retry; the key is \
             read per request, so the server does not need a restart."
        ))),
    }
}

/// First few characters of the credential, safe to surface in diagnostics.
#[must_use]
pub fn key_prefix(key: &str) -> String {
    key.chars().take(4).collect()
}

/// Listen port for the HTTP service.
#[must_use]
pub fn server_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(3000)
}

/// Where the upstream payload cache lives.
#[must_use]
pub fn cache_dir() -> PathBuf {
    env::var("WEATHERBOARD_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".weatherboard-cache"))
}
