//! HTTP service boundary for the aggregator.
//!
//! One route: `GET /weather?city=<name>`. Success returns the normalized
//! document; failures return the error envelope with the status mirroring the
//! upstream failure.

use axum::extract::{Query, State};
use axum::response::Json;
use axum::{Router, routing::get};
use serde::Deserialize;

use crate::error::WeatherError;
use crate::models::WeatherDocument;
use crate::openweather::OpenWeatherClient;
use crate::{aggregate, config};

#[derive(Clone)]
pub struct AppState {
    client: OpenWeatherClient,
}

/// Build the API router around one provider client. Tests inject a client
/// pointed at a mock server.
pub fn router(client: OpenWeatherClient) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .with_state(AppState { client })
}

#[derive(Debug, Deserialize)]
struct WeatherParams {
    city: Option<String>,
}

async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<WeatherDocument>, WeatherError> {
    let city = params
        .city
        .filter(|city| !city.is_empty())
        .unwrap_or_else(|| config::DEFAULT_CITY.to_string());
    let document = aggregate::fetch_weather(&state.client, &city).await?;
    Ok(Json(document))
}
