//! OpenWeatherMap client.
//!
//! Two endpoints are used per dashboard request: current conditions
//! (`/weather`) and the 5-day/3-hour forecast (`/forecast`). Each leg is
//! checked for provider-level success independently and classified into the
//! service error taxonomy; the integration depends only on the provider's
//! documented fields (`coord`, `main`, `weather[0].id`, `wind`, `dt`, and the
//! forecast `list`).

use std::fmt::Debug;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::conditions::{FALLBACK_CODE, map_condition_code};
use crate::error::{Leg, WeatherError};
use crate::{cache, cities, config};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

// fixed upstream parameters: metric units, zh_cn condition descriptions
const UNITS: &str = "metric";
const LANG: &str = "zh_cn";

/// One city lookup as sent upstream: the name the user asked for and the
/// provider-recognized spelling actually used in both requests.
#[derive(Debug, Clone)]
pub struct CityQuery {
    pub requested: String,
    pub normalized: String,
}

impl CityQuery {
    pub fn new(requested: impl Into<String>) -> Self {
        let requested = requested.into();
        let normalized = cities::provider_name(&requested).to_string();
        if requested != normalized {
            info!(%requested, %normalized, "normalized city name");
        }
        Self {
            requested,
            normalized,
        }
    }

    /// Whether the request was already in provider format.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.requested == self.normalized
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Temperature and humidity block, shared by current conditions and every
/// forecast sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionTag {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<i64>,
}

/// `/weather` response, current conditions for one city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub coord: Coord,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
    pub wind: Wind,
    /// Observation time, unix seconds.
    pub dt: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl CurrentConditions {
    /// Mapped internal condition code; fallback when the provider sent no
    /// condition tag at all.
    #[must_use]
    pub fn condition_code(&self) -> u8 {
        self.weather
            .first()
            .map_or(FALLBACK_CODE, |tag| map_condition_code(tag.id))
    }
}

/// One 3-hour forecast sample from the `/forecast` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Sample time, unix seconds.
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
}

impl ForecastSample {
    #[must_use]
    pub fn condition_code(&self) -> u8 {
        self.weather
            .first()
            .map_or(FALLBACK_CODE, |tag| map_condition_code(tag.id))
    }
}

/// `/forecast` response: up to 40 samples, one per 3 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastSample>,
}

/// HTTP client for the provider. `base_url` is swappable so tests can point
/// at a local mock server.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for OpenWeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenWeatherClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: crate::API_CLIENT.clone(),
            base_url: base_url.into(),
        }
    }

    /// Fetch current conditions for the query's normalized city.
    pub async fn current(
        &self,
        query: &CityQuery,
        api_key: &str,
    ) -> Result<CurrentConditions, WeatherError> {
        self.fetch_leg(Leg::Current, "weather", query, api_key).await
    }

    /// Fetch the 3-hour forecast for the query's normalized city.
    pub async fn forecast(
        &self,
        query: &CityQuery,
        api_key: &str,
    ) -> Result<ForecastResponse, WeatherError> {
        self.fetch_leg(Leg::Forecast, "forecast", query, api_key).await
    }

    async fn fetch_leg<T>(
        &self,
        leg: Leg,
        endpoint: &str,
        query: &CityQuery,
        api_key: &str,
    ) -> Result<T, WeatherError>
    where
        T: DeserializeOwned + Serialize + Clone + Debug + Send + 'static,
    {
        let cache_key = format!("owm:{endpoint}:{}", query.normalized);
        match cache::get::<T>(&cache_key).await {
            Ok(Some(cached)) => {
                debug!(%cache_key, "serving cached upstream payload");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(err) => warn!("cache lookup failed: {err}"),
        }

        let url = format!(
            "{}/{}?q={}&appid={}&units={}&lang={}",
            self.base_url,
            endpoint,
            urlencoding::encode(&query.normalized),
            api_key,
            UNITS,
            LANG,
        );
        debug!(?leg, url = %url.replace(api_key, "***"), "requesting upstream");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherError::Transport(format!("{endpoint} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
            error!(?leg, status = %status, body = %body, "upstream error response");
            return Err(classify_failure(
                leg,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                body,
                query,
                api_key,
            ));
        }

        let payload: T = response.json().await.map_err(|e| {
            WeatherError::Transport(format!("Failed to parse {endpoint} response: {e}"))
        })?;

        if let Err(err) = cache::put(&cache_key, payload.clone(), config::CACHE_TTL).await {
            warn!("cache store failed: {err}");
        }
        Ok(payload)
    }
}

/// The provider reports its error code both as the HTTP status and as a
/// `cod` body field that may be a number or a numeric string; prefer the body
/// when it parses.
fn provider_code(status: u16, body: &Value) -> u16 {
    match body.get("cod") {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()).unwrap_or(status),
        Some(Value::String(s)) => s.parse().unwrap_or(status),
        _ => status,
    }
}

/// Map a non-2xx provider response onto the error taxonomy.
///
/// Precedence: auth (401) → not-found (404) → rate-limit (429) → generic.
fn classify_failure(
    leg: Leg,
    status: u16,
    status_text: &str,
    body: Value,
    query: &CityQuery,
    api_key: &str,
) -> WeatherError {
    let provider_message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let code = provider_code(status, &body);

    if status == 401 || code == 401 {
        let invalid_key = provider_message.contains("Invalid API key")
            || provider_message.contains("invalid api key");
        let message = if invalid_key {
            format!(
                "Invalid API key (current: {}...). Verify the key is correct and already \
                 activated (newly registered keys can take up to two hours) at \
                 https://openweathermap.org/api_keys",
                config::key_prefix(api_key)
            )
        } else {
            "API key authentication failed (401). The key may not be activated yet \
             (activation can take up to two hours after registration), or the configured \
             OPENWEATHER_API_KEY is wrong. Check the key status at \
             https://openweathermap.org/api_keys"
                .to_string()
        };
        return WeatherError::Auth {
            leg,
            invalid_key,
            message,
            details: body,
        };
    }

    if status == 404 || code == 404 {
        let message = if query.is_passthrough() {
            format!("City not found: {}", query.requested)
        } else {
            format!(
                "City not found: {} (tried: {})",
                query.requested, query.normalized
            )
        };
        return WeatherError::CityNotFound {
            leg,
            message,
            details: body,
        };
    }

    if status == 429 || code == 429 {
        return WeatherError::RateLimited {
            leg,
            message: "Too many requests to the weather provider, please retry later".to_string(),
            details: body,
        };
    }

    let message = if provider_message.is_empty() {
        format!("{}: {status} {status_text}", leg.envelope_label())
    } else {
        provider_message
    };
    WeatherError::Upstream {
        leg,
        status,
        message,
        details: body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped_query() -> CityQuery {
        CityQuery::new("北京")
    }

    #[test]
    fn query_normalizes_curated_names() {
        let query = mapped_query();
        assert_eq!(query.requested, "北京");
        assert_eq!(query.normalized, "Beijing");
        assert!(!query.is_passthrough());
        assert!(CityQuery::new("Atlantis").is_passthrough());
    }

    #[test]
    fn auth_failure_with_invalid_key_message_selects_invalid_variant() {
        let err = classify_failure(
            Leg::Current,
            401,
            "Unauthorized",
            json!({"cod": 401, "message": "Invalid API key. Please see https://openweathermap.org/faq"}),
            &mapped_query(),
            "abcd1234secret",
        );
        match err {
            WeatherError::Auth {
                invalid_key,
                message,
                ..
            } => {
                assert!(invalid_key);
                assert!(message.contains("Invalid API key"));
                // only a short prefix of the credential may surface
                assert!(message.contains("abcd..."));
                assert!(!message.contains("abcd1234secret"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn auth_failure_without_invalid_key_message_selects_activation_variant() {
        let err = classify_failure(
            Leg::Forecast,
            401,
            "Unauthorized",
            json!({"cod": "401", "message": "Please note that using One Call requires a separate subscription"}),
            &mapped_query(),
            "abcd1234",
        );
        match err {
            WeatherError::Auth {
                invalid_key,
                message,
                ..
            } => {
                assert!(!invalid_key);
                assert!(message.contains("not be activated"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn not_found_names_both_cities_when_they_differ() {
        let err = classify_failure(
            Leg::Current,
            404,
            "Not Found",
            json!({"cod": "404", "message": "city not found"}),
            &mapped_query(),
            "key",
        );
        assert_eq!(
            err.to_string(),
            "City not found: 北京 (tried: Beijing)"
        );
    }

    #[test]
    fn not_found_names_only_the_requested_city_on_passthrough() {
        let err = classify_failure(
            Leg::Current,
            404,
            "Not Found",
            json!({"cod": "404", "message": "city not found"}),
            &CityQuery::new("Atlantis"),
            "key",
        );
        assert_eq!(err.to_string(), "City not found: Atlantis");
    }

    #[test]
    fn body_cod_string_is_honored_over_generic_status() {
        // some provider deployments put the real code only in the body
        let err = classify_failure(
            Leg::Forecast,
            400,
            "Bad Request",
            json!({"cod": "429", "message": "Your account is temporary blocked"}),
            &mapped_query(),
            "key",
        );
        assert!(matches!(err, WeatherError::RateLimited { .. }));
    }

    #[test]
    fn unclassified_failure_keeps_provider_message() {
        let err = classify_failure(
            Leg::Forecast,
            500,
            "Internal Server Error",
            json!({"cod": 500, "message": "upstream exploded"}),
            &mapped_query(),
            "key",
        );
        match &err {
            WeatherError::Upstream { status, .. } => assert_eq!(*status, 500),
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(err.to_string(), "upstream exploded");
    }

    #[test]
    fn unclassified_failure_without_message_reports_status_line() {
        let err = classify_failure(
            Leg::Current,
            502,
            "Bad Gateway",
            json!({}),
            &mapped_query(),
            "key",
        );
        assert_eq!(
            err.to_string(),
            "Failed to fetch weather data: 502 Bad Gateway"
        );
    }

    #[test]
    fn current_conditions_deserialize_from_provider_shape() {
        let payload = json!({
            "coord": {"lat": 39.9075, "lon": 116.3972},
            "weather": [{"id": 803, "main": "Clouds", "description": "多云", "icon": "04d"}],
            "main": {"temp": 28.94, "feels_like": 30.1, "temp_min": 27.0, "temp_max": 31.2,
                      "pressure": 1004, "humidity": 62},
            "wind": {"speed": 3.5, "deg": 180},
            "dt": 1754550000i64,
            "name": "Beijing"
        });
        let current: CurrentConditions = serde_json::from_value(payload).unwrap();
        assert_eq!(current.condition_code(), 3);
        assert_eq!(current.wind.deg, Some(180));
        assert_eq!(current.main.humidity, 62);
    }

    #[test]
    fn missing_wind_deg_and_weather_tags_fall_back() {
        let payload = json!({
            "coord": {"lat": 1.0, "lon": 2.0},
            "weather": [],
            "main": {"temp": 20.0, "temp_min": 18.0, "temp_max": 22.0, "humidity": 50},
            "wind": {"speed": 1.0},
            "dt": 1754550000i64
        });
        let current: CurrentConditions = serde_json::from_value(payload).unwrap();
        assert_eq!(current.condition_code(), FALLBACK_CODE);
        assert_eq!(current.wind.deg, None);
        assert_eq!(current.name, None);
    }

    #[test]
    fn forecast_deserializes_sample_list() {
        let payload = json!({
            "cod": "200",
            "list": [
                {"dt": 1754560800i64,
                 "main": {"temp": 26.0, "temp_min": 25.0, "temp_max": 27.0, "humidity": 70},
                 "weather": [{"id": 500}]},
                {"dt": 1754571600i64,
                 "main": {"temp": 24.0, "temp_min": 23.0, "temp_max": 25.0, "humidity": 75},
                 "weather": [{"id": 800}]}
            ]
        });
        let forecast: ForecastResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(forecast.list.len(), 2);
        assert_eq!(forecast.list[0].condition_code(), 61);
        assert_eq!(forecast.list[1].condition_code(), 0);
    }
}
