//! Error types for the weather aggregation service.
//!
//! Every upstream failure is caught at the aggregation boundary and converted
//! into one of these variants; none are retried and none are silently
//! swallowed. The HTTP envelope mirrors the upstream failure's status code and
//! always carries a human-readable `message`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// Which upstream request a failure came from. A failure on either leg
/// short-circuits the whole operation; the envelope's `error` field records
/// which one it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Current,
    Forecast,
}

impl Leg {
    #[must_use]
    pub fn envelope_label(self) -> &'static str {
        match self {
            Leg::Current => "Failed to fetch weather data",
            Leg::Forecast => "Failed to fetch forecast data",
        }
    }
}

/// Main error type for the weather service.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Credential missing or unusable before any request was made.
    #[error("{message}")]
    Config { message: String },

    /// Provider rejected the credential (401). `invalid_key` records whether
    /// the provider's message named the key as invalid, as opposed to a key
    /// that is not yet active.
    #[error("{message}")]
    Auth {
        leg: Leg,
        invalid_key: bool,
        message: String,
        details: Value,
    },

    /// Provider did not recognize the city (404).
    #[error("{message}")]
    CityNotFound { leg: Leg, message: String, details: Value },

    /// Provider rate limit hit (429). No backoff is performed.
    #[error("{message}")]
    RateLimited { leg: Leg, message: String, details: Value },

    /// Any other non-2xx provider response.
    #[error("{message}")]
    Upstream {
        leg: Leg,
        status: u16,
        message: String,
        details: Value,
    },

    /// Network-level failure before a status code was available.
    #[error("Network error: {0}")]
    Transport(String),

    /// The shared upstream budget elapsed; both in-flight requests were
    /// abandoned.
    #[error("Weather provider request timed out, please retry later")]
    Timeout,

    /// Client-side: a 200 response missing an expected top-level section.
    #[error("Data format error: {0}")]
    Format(String),
}

impl WeatherError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status the service boundary reports for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            WeatherError::Auth { .. } => StatusCode::UNAUTHORIZED,
            WeatherError::CityNotFound { .. } => StatusCode::NOT_FOUND,
            WeatherError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            WeatherError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            WeatherError::Config { .. }
            | WeatherError::Transport(_)
            | WeatherError::Timeout
            | WeatherError::Format(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Provider error body, present only for upstream-relayed failures.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            WeatherError::Auth { details, .. }
            | WeatherError::CityNotFound { details, .. }
            | WeatherError::RateLimited { details, .. }
            | WeatherError::Upstream { details, .. } => Some(details),
            _ => None,
        }
    }

    fn leg(&self) -> Option<Leg> {
        match self {
            WeatherError::Auth { leg, .. }
            | WeatherError::CityNotFound { leg, .. }
            | WeatherError::RateLimited { leg, .. }
            | WeatherError::Upstream { leg, .. } => Some(*leg),
            _ => None,
        }
    }

    /// JSON error envelope served at the HTTP boundary.
    #[must_use]
    pub fn envelope(&self) -> Value {
        let label = self
            .leg()
            .map_or("Failed to fetch weather data", Leg::envelope_label);
        let mut body = json!({
            "error": label,
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = details.clone();
        }
        body
    }
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        tracing::error!(status = %self.status(), "request failed: {self}");
        (self.status(), Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> WeatherError {
        WeatherError::CityNotFound {
            leg: Leg::Current,
            message: "City not found: Atlantis".to_string(),
            details: json!({"cod": "404", "message": "city not found"}),
        }
    }

    #[test]
    fn status_codes_mirror_the_taxonomy() {
        assert_eq!(
            WeatherError::config("no key").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WeatherError::RateLimited {
                leg: Leg::Forecast,
                message: "retry later".to_string(),
                details: Value::Null,
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            WeatherError::Upstream {
                leg: Leg::Current,
                status: 503,
                message: "unavailable".to_string(),
                details: Value::Null,
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(WeatherError::Timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_carries_leg_label_and_details() {
        let envelope = not_found().envelope();
        assert_eq!(envelope["error"], "Failed to fetch weather data");
        assert_eq!(envelope["message"], "City not found: Atlantis");
        assert_eq!(envelope["details"]["cod"], "404");
    }

    #[test]
    fn forecast_leg_gets_its_own_label() {
        let err = WeatherError::Upstream {
            leg: Leg::Forecast,
            status: 500,
            message: "boom".to_string(),
            details: Value::Null,
        };
        assert_eq!(err.envelope()["error"], "Failed to fetch forecast data");
    }

    #[test]
    fn non_upstream_failures_have_no_details() {
        let envelope = WeatherError::Timeout.envelope();
        assert_eq!(envelope["error"], "Failed to fetch weather data");
        assert!(envelope.get("details").is_none());
        assert!(WeatherError::config("x").details().is_none());
    }
}
