//! Terminal weather display.
//!
//! Drives the aggregation service and renders its document: a current
//! conditions card, the 7-day grid, and the 24-hour strip. One city is
//! selected at a time; a typed search or advancing the fixed rotation
//! re-enters the loading state. Responses from superseded requests are
//! suppressed with a generation counter: each new request claims a fresh
//! generation, and an outcome is applied only while its captured generation
//! is still current.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write as _};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{Leg, WeatherError};
use crate::models::WeatherDocument;
use crate::{conditions, config};

/// Fixed rotation the "next city" action cycles through.
pub const CITY_ROTATION: [&str; 40] = [
    "Beijing", "Shanghai", "Guangzhou", "Shenzhen", "Hangzhou", "Chengdu", "Chongqing", "Xi'an",
    "Nanjing", "Wuhan", "Tianjin", "Suzhou", "Changsha", "Zhengzhou", "Dongguan", "Qingdao",
    "Shenyang", "Ningbo", "Kunming", "Dalian", "Xiamen", "Hefei", "Foshan", "Fuzhou", "Harbin",
    "Jinan", "Wenzhou", "Shijiazhuang", "Quanzhou", "Changchun", "Guiyang", "Nanchang", "London",
    "New York", "Tokyo", "Paris", "Sydney", "Singapore", "Seoul", "Bangkok",
];

/// Initial selection when the dashboard starts.
pub const INITIAL_CITY: &str = "Shenzhen";

/// Where the display gets its documents from. The HTTP service is the real
/// source; tests substitute canned payloads.
#[async_trait]
pub trait WeatherSource {
    async fn fetch(&self, city: &str) -> Result<Value, WeatherError>;
}

/// Fetches documents from the aggregation service.
pub struct HttpWeatherSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWeatherSource {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: crate::API_CLIENT.clone(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn fetch(&self, city: &str) -> Result<Value, WeatherError> {
        let url = format!(
            "{}/api/weather?city={}",
            self.base_url,
            urlencoding::encode(city)
        );
        debug!(%url, "requesting weather document");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| WeatherError::Transport(format!("Failed to parse response: {e}")))?;

        if !status.is_success() {
            // relay the service's message; the envelope label is the fallback
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| body.get("error").and_then(Value::as_str))
                .map_or_else(
                    || format!("Failed to fetch weather data: {status}"),
                    str::to_string,
                );
            return Err(WeatherError::Upstream {
                leg: Leg::Current,
                status: status.as_u16(),
                message,
                details: body,
            });
        }
        Ok(body)
    }
}

/// Check that a 200 payload has every top-level section before rendering.
/// A missing section is a format error, never a partial render.
pub fn validate_document(payload: Value) -> Result<WeatherDocument, WeatherError> {
    for (field, section) in [
        ("current_weather", "current weather"),
        ("daily", "daily"),
        ("hourly", "hourly"),
    ] {
        if payload.get(field).is_none_or(Value::is_null) {
            return Err(WeatherError::Format(format!("Missing {section} data")));
        }
    }
    serde_json::from_value(payload)
        .map_err(|e| WeatherError::Format(format!("Malformed weather document: {e}")))
}

#[derive(Debug)]
pub enum DisplayState {
    Idle,
    Loading { city: String },
    Ready(Box<WeatherDocument>),
    Failed { city: String, message: String },
}

pub struct Dashboard<S> {
    source: S,
    state: DisplayState,
    current_city: String,
    rotation_index: usize,
    generation: u64,
}

impl<S: WeatherSource> Dashboard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: DisplayState::Idle,
            current_city: INITIAL_CITY.to_string(),
            rotation_index: 0,
            generation: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    #[must_use]
    pub fn current_city(&self) -> &str {
        &self.current_city
    }

    #[must_use]
    pub fn next_in_rotation(&self) -> &'static str {
        CITY_ROTATION[(self.rotation_index + 1) % CITY_ROTATION.len()]
    }

    /// Enter the loading state and claim a new generation. Outcomes captured
    /// under an older generation are stale from this point on.
    pub fn begin_request(&mut self, city: &str) -> u64 {
        self.generation += 1;
        self.current_city = city.to_string();
        self.state = DisplayState::Loading {
            city: city.to_string(),
        };
        self.generation
    }

    /// Apply a request outcome. Dropped when a newer request superseded it:
    /// the latest request's outcome wins.
    pub fn apply(
        &mut self,
        generation: u64,
        city: &str,
        outcome: Result<WeatherDocument, WeatherError>,
    ) {
        if generation != self.generation {
            debug!(stale = generation, current = self.generation, "discarding superseded response");
            return;
        }
        match outcome {
            Ok(document) => {
                self.current_city = document.city.clone();
                self.state = DisplayState::Ready(Box::new(document));
            }
            Err(err) => {
                self.state = DisplayState::Failed {
                    city: city.to_string(),
                    message: err.to_string(),
                };
            }
        }
    }

    /// Fetch, validate, and apply one city's document under the display
    /// timeout (distinct from the service's own upstream budget).
    pub async fn refresh(&mut self, city: String) {
        let generation = self.begin_request(&city);
        let outcome =
            match tokio::time::timeout(config::DISPLAY_TIMEOUT, self.source.fetch(&city)).await {
                Ok(result) => result.and_then(validate_document),
                Err(_) => Err(WeatherError::Transport(
                    "Request timeout, please check your network connection".to_string(),
                )),
            };
        self.apply(generation, &city, outcome);
    }

    /// Search for a typed city name; blank input is ignored.
    pub async fn search(&mut self, input: &str) {
        let city = input.trim();
        if city.is_empty() {
            return;
        }
        self.refresh(city.to_string()).await;
    }

    /// Advance to the next city in the fixed rotation.
    pub async fn advance_rotation(&mut self) {
        self.rotation_index = (self.rotation_index + 1) % CITY_ROTATION.len();
        self.refresh(CITY_ROTATION[self.rotation_index].to_string())
            .await;
    }

    /// Re-request the current city after a failure.
    pub async fn retry(&mut self) {
        self.refresh(self.current_city.clone()).await;
    }

    #[must_use]
    pub fn render(&self) -> String {
        match &self.state {
            DisplayState::Idle => "Enter a city name to begin.".to_string(),
            DisplayState::Loading { city } => format!("Loading weather data... ({city})"),
            DisplayState::Failed { city, message } => {
                format!("❌ {message}\n({city}: press Enter to retry)")
            }
            DisplayState::Ready(document) => render_document(document),
        }
    }
}

fn format_day(time: &DateTime<Utc>) -> String {
    time.format("%a %b %d").to_string()
}

fn render_document(doc: &WeatherDocument) -> String {
    let mut out = String::new();
    let current = &doc.current_weather;

    let _ = writeln!(
        out,
        "{}  {} {}",
        doc.city,
        conditions::glyph(current.weathercode),
        conditions::describe(current.weathercode)
    );
    let _ = writeln!(
        out,
        "{:.0}°  ({:.0}° / {:.0}°)   wind {:.1} km/h   {}",
        current.temperature,
        doc.daily.temperature_2m_max.first().copied().unwrap_or(current.temperature),
        doc.daily.temperature_2m_min.first().copied().unwrap_or(current.temperature),
        current.windspeed,
        current.time.format("%Y-%m-%d %H:%M UTC"),
    );

    let _ = writeln!(out, "\n7 day forecast:");
    for idx in 0..doc.daily.len() {
        let (Some(time), Some(&code), Some(&max), Some(&min)) = (
            doc.daily.time.get(idx),
            doc.daily.weathercode.get(idx),
            doc.daily.temperature_2m_max.get(idx),
            doc.daily.temperature_2m_min.get(idx),
        ) else {
            break;
        };
        let label = if idx == 0 {
            "Today".to_string()
        } else {
            format_day(time)
        };
        let _ = writeln!(
            out,
            "  {label:<10} {} {:>3.0}° / {:>3.0}°  {}",
            conditions::glyph(code),
            max,
            min,
            conditions::describe(code)
        );
    }

    let _ = writeln!(out, "\n24 hour forecast:");
    for idx in 0..doc.hourly.len() {
        let (Some(time), Some(&temp), Some(&humidity), Some(&code)) = (
            doc.hourly.time.get(idx),
            doc.hourly.temperature_2m.get(idx),
            doc.hourly.relative_humidity_2m.get(idx),
            doc.hourly.weathercode.get(idx),
        ) else {
            break;
        };
        let label = if idx == 0 {
            "Now  ".to_string()
        } else {
            time.format("%H:00").to_string()
        };
        let _ = writeln!(
            out,
            "  {label} {} {:>3.0}°  {humidity:>3}%",
            conditions::glyph(code),
            temp
        );
    }

    out
}

/// Interactive loop: typed input searches, an empty line advances the
/// rotation (or retries after a failure), `q` quits.
pub async fn run(base_url: String) -> anyhow::Result<()> {
    let mut dashboard = Dashboard::new(HttpWeatherSource::new(base_url));
    dashboard.refresh(INITIAL_CITY.to_string()).await;
    println!("{}", dashboard.render());

    let stdin = io::stdin();
    loop {
        println!(
            "\nCurrent: {} | Next: {}",
            dashboard.current_city(),
            dashboard.next_in_rotation()
        );
        print!("city (Enter = next, q = quit) > ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "q" | "quit" => break,
            "" => {
                if matches!(dashboard.state(), DisplayState::Failed { .. }) {
                    dashboard.retry().await;
                } else {
                    dashboard.advance_rotation().await;
                }
            }
            city => dashboard.search(city).await,
        }
        println!("{}", dashboard.render());
    }
    Ok(())
}
