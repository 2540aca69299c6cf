//! Weather aggregation: one city in, one normalized document out.
//!
//! Both upstream legs are issued concurrently and joined under a single
//! shared budget; whichever leg fails first decides the error and the sibling
//! request is dropped. The joined payloads are then reshaped into the fixed
//! 7-day / 24-hour series the dashboard renders.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::try_join;
use tracing::info;

use crate::config;
use crate::error::WeatherError;
use crate::models::{CurrentWeather, DailySeries, HourlySeries, WeatherDocument};
use crate::openweather::{CityQuery, CurrentConditions, ForecastSample, OpenWeatherClient};

const DAILY_SLOTS: usize = 7;
const HOURLY_SLOTS: usize = 24;
/// The provider emits one forecast sample per 3 hours; only the first 8
/// (roughly the next day) feed the hourly strip, the rest is forward-filled.
const HOURLY_SOURCE_SAMPLES: usize = 8;
const MS_TO_KMH: f64 = 3.6;

/// Fetch, normalize, and reshape weather for one requested city.
pub async fn fetch_weather(
    client: &OpenWeatherClient,
    requested_city: &str,
) -> Result<WeatherDocument, WeatherError> {
    // read per request so late configuration injection is tolerated
    let api_key = config::api_key()?;
    let query = CityQuery::new(requested_city);
    info!(requested = %query.requested, upstream = %query.normalized, "fetching weather");

    let joined = tokio::time::timeout(
        config::UPSTREAM_BUDGET,
        try_join(
            client.current(&query, &api_key),
            client.forecast(&query, &api_key),
        ),
    )
    .await
    .map_err(|_| WeatherError::Timeout)?;
    let (current, forecast) = joined?;

    Ok(build_document(&query, &current, &forecast.list, Utc::now()))
}

fn build_document(
    query: &CityQuery,
    current: &CurrentConditions,
    samples: &[ForecastSample],
    now: DateTime<Utc>,
) -> WeatherDocument {
    WeatherDocument {
        city: display_name(query, current),
        latitude: current.coord.lat,
        longitude: current.coord.lon,
        current_weather: current_weather(current, now),
        daily: daily_series(current, samples, now),
        hourly: hourly_series(current, samples, now),
    }
}

/// The document shows the name the user asked for; the provider's returned
/// name is used only when the request was already in provider format.
fn display_name(query: &CityQuery, current: &CurrentConditions) -> String {
    if query.is_passthrough() {
        current
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| query.requested.clone())
    } else {
        query.requested.clone()
    }
}

fn sample_time(dt: i64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt, 0).unwrap_or(fallback)
}

fn current_weather(current: &CurrentConditions, now: DateTime<Utc>) -> CurrentWeather {
    CurrentWeather {
        temperature: current.main.temp,
        weathercode: current.condition_code(),
        windspeed: current.wind.speed * MS_TO_KMH,
        winddirection: current.wind.deg.unwrap_or(0),
        time: sample_time(current.dt, now),
    }
}

struct DayBucket {
    max: f64,
    min: f64,
    codes: Vec<u8>,
}

/// Seven day slots in ascending date order starting from now.
///
/// Slot 0 always comes from the current-conditions response: the forecast's
/// same-day bucket may only cover the remaining hours of today and understate
/// the day's true range. Later slots take the running max/min of their
/// calendar-date bucket; an empty bucket forward-fills the previous slot.
fn daily_series(
    current: &CurrentConditions,
    samples: &[ForecastSample],
    now: DateTime<Utc>,
) -> DailySeries {
    let mut buckets: HashMap<NaiveDate, DayBucket> = HashMap::new();
    for sample in samples {
        let date = sample_time(sample.dt, now).date_naive();
        let temp = sample.main.temp;
        let bucket = buckets.entry(date).or_insert(DayBucket {
            max: temp,
            min: temp,
            codes: Vec::new(),
        });
        bucket.max = bucket.max.max(temp);
        bucket.min = bucket.min.min(temp);
        bucket.codes.push(sample.condition_code());
    }

    let mut series = DailySeries {
        time: Vec::with_capacity(DAILY_SLOTS),
        weathercode: Vec::with_capacity(DAILY_SLOTS),
        temperature_2m_max: Vec::with_capacity(DAILY_SLOTS),
        temperature_2m_min: Vec::with_capacity(DAILY_SLOTS),
    };
    let mut last_max = current.main.temp_max;
    let mut last_min = current.main.temp_min;
    let mut last_code = current.condition_code();

    for offset in 0..DAILY_SLOTS as i64 {
        let slot_time = now + Duration::days(offset);
        let (max, min, code) = if offset == 0 {
            (current.main.temp_max, current.main.temp_min, current.condition_code())
        } else if let Some(bucket) = buckets.get(&slot_time.date_naive()) {
            (bucket.max, bucket.min, most_common_code(&bucket.codes))
        } else {
            // forecast horizon shorter than the grid: repeat the previous slot
            (last_max, last_min, last_code)
        };

        series.time.push(slot_time);
        series.temperature_2m_max.push(max);
        series.temperature_2m_min.push(min);
        series.weathercode.push(code);
        (last_max, last_min, last_code) = (max, min, code);
    }

    series
}

/// Statistical mode of a bucket's codes.
///
/// The tie-break is first-seen-wins under a greater-or-equal comparison: the
/// incumbent survives whenever its count is at least the challenger's. This
/// is observable output, so the reduction order is kept as-is.
fn most_common_code(codes: &[u8]) -> u8 {
    let count = |code: u8| codes.iter().filter(|&&c| c == code).count();
    let mut iter = codes.iter().copied();
    let Some(mut mode) = iter.next() else {
        return crate::conditions::FALLBACK_CODE;
    };
    for candidate in iter {
        if count(mode) < count(candidate) {
            mode = candidate;
        }
    }
    mode
}

/// Twenty-four hour slots: "now" first, then every forecast sample strictly
/// after now from the first [`HOURLY_SOURCE_SAMPLES`], then simulated hours
/// repeating the last known reading until the strip is full.
fn hourly_series(
    current: &CurrentConditions,
    samples: &[ForecastSample],
    now: DateTime<Utc>,
) -> HourlySeries {
    let mut series = HourlySeries {
        time: Vec::with_capacity(HOURLY_SLOTS),
        temperature_2m: Vec::with_capacity(HOURLY_SLOTS),
        relative_humidity_2m: Vec::with_capacity(HOURLY_SLOTS),
        weathercode: Vec::with_capacity(HOURLY_SLOTS),
    };

    let mut last_time = now;
    let mut last_temp = current.main.temp;
    let mut last_humidity = current.main.humidity;
    let mut last_code = current.condition_code();

    series.time.push(last_time);
    series.temperature_2m.push(last_temp);
    series.relative_humidity_2m.push(last_humidity);
    series.weathercode.push(last_code);

    for sample in samples.iter().take(HOURLY_SOURCE_SAMPLES) {
        let time = sample_time(sample.dt, now);
        if time <= now {
            continue;
        }
        (last_time, last_temp, last_humidity, last_code) = (
            time,
            sample.main.temp,
            sample.main.humidity,
            sample.condition_code(),
        );
        series.time.push(last_time);
        series.temperature_2m.push(last_temp);
        series.relative_humidity_2m.push(last_humidity);
        series.weathercode.push(last_code);
    }

    while series.time.len() < HOURLY_SLOTS {
        last_time = last_time + Duration::hours(1);
        series.time.push(last_time);
        series.temperature_2m.push(last_temp);
        series.relative_humidity_2m.push(last_humidity);
        series.weathercode.push(last_code);
    }

    series.time.truncate(HOURLY_SLOTS);
    series.temperature_2m.truncate(HOURLY_SLOTS);
    series.relative_humidity_2m.truncate(HOURLY_SLOTS);
    series.weathercode.truncate(HOURLY_SLOTS);
    series
}
