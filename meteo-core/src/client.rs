use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    Config,
    config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_ENDPOINT, DEFAULT_READ_TIMEOUT_SECS},
    error::WeatherError,
    model::{Coordinates, WeatherObservation},
};

/// Variables requested in the `current` query parameter, in request order.
pub const CURRENT_FIELDS: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "weather_code",
    "cloud_cover",
    "pressure_msl",
    "surface_pressure",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherObservation, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    endpoint: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, WeatherError> {
        // No idle pooling: a call's connection is dropped when the call ends.
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(WeatherError::ClientBuild)?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// Public endpoint, 5s connect timeout, 10s read timeout.
    pub fn with_defaults() -> Result<Self, WeatherError> {
        Self::new(
            DEFAULT_ENDPOINT,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        )
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        Self::new(
            config.endpoint.clone(),
            config.connect_timeout(),
            config.read_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl WeatherClient for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn fetch_current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherObservation, WeatherError> {
        let requested = Coordinates::new(latitude, longitude)?;
        let url = build_request_url(&self.endpoint, latitude, longitude);

        debug!(url = %url, "Fetching current weather");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(WeatherError::Transport)?;

        let status = res.status();
        if status != StatusCode::OK {
            // The error body is only used for the message.
            let body = res.text().await.unwrap_or_default();
            let reason = error_reason(status, &body);
            warn!(status = status.as_u16(), %reason, "Open-Meteo returned an error status");
            return Err(WeatherError::HttpStatus {
                code: status.as_u16(),
                reason,
            });
        }

        let body = res.text().await.map_err(WeatherError::Transport)?;
        let observation = parse_observation(&body, requested)?;

        debug!(%observation, "Current weather parsed");
        Ok(observation)
    }
}

/// Construct the default client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherClient>> {
    let client = OpenMeteoClient::from_config(config)?;
    Ok(Box::new(client))
}

/// Full request URL: coordinates to four decimals, then the fixed `current` list.
pub fn build_request_url(endpoint: &str, latitude: f64, longitude: f64) -> String {
    format!(
        "{endpoint}?latitude={latitude:.4}&longitude={longitude:.4}&current={}&wind_speed_unit=ms",
        CURRENT_FIELDS.join(",")
    )
}

/// Project an Open-Meteo body onto a [`WeatherObservation`].
///
/// Only a body that is not JSON at all is an error. Missing keys, `null`s and
/// values of the wrong type leave the matching field `None`. When the body
/// does not echo the coordinates, the requested ones are used.
pub fn parse_observation(
    body: &str,
    requested: Coordinates,
) -> Result<WeatherObservation, WeatherError> {
    let root: Value = serde_json::from_str(body)?;
    let current = root.get("current");
    let number = |key: &str| current.and_then(|c| c.get(key)).and_then(Value::as_f64);

    let utc_offset = root
        .get("utc_offset_seconds")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Ok(WeatherObservation {
        latitude: root
            .get("latitude")
            .and_then(Value::as_f64)
            .unwrap_or(requested.latitude),
        longitude: root
            .get("longitude")
            .and_then(Value::as_f64)
            .unwrap_or(requested.longitude),
        observed_at: current
            .and_then(|c| c.get("time"))
            .and_then(Value::as_str)
            .and_then(|s| parse_observation_time(s, utc_offset)),

        temperature_celsius: number("temperature_2m"),
        apparent_temperature_celsius: number("apparent_temperature"),
        relative_humidity_percent: number("relative_humidity_2m"),
        cloud_cover_percent: number("cloud_cover"),
        wind_speed_meters_per_second: number("wind_speed_10m"),
        wind_direction_degrees: number("wind_direction_10m"),
        pressure_msl_hectopascals: number("pressure_msl"),

        precipitation_millimeters: number("precipitation"),
        rain_millimeters: number("rain"),
        showers_millimeters: number("showers"),
        snowfall_centimeters: number("snowfall"),
        weather_code: number("weather_code").and_then(wmo_code),
        surface_pressure_hectopascals: number("surface_pressure"),
        wind_gusts_meters_per_second: number("wind_gusts_10m"),
    })
}

fn wmo_code(value: f64) -> Option<u8> {
    if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

/// `current.time` is local to the response's `utc_offset_seconds` (0 unless a
/// timezone was requested) and carries no offset itself.
fn parse_observation_time(s: &str, utc_offset_secs: i64) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;

    let offset = FixedOffset::east_opt(i32::try_from(utc_offset_secs).ok()?)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Open-Meteo error bodies look like `{"error": true, "reason": "..."}`.
fn error_reason(status: StatusCode, body: &str) -> String {
    if let Some(reason) = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("reason"))
        .and_then(Value::as_str)
    {
        return reason.to_string();
    }

    if body.trim().is_empty() {
        return status.canonical_reason().unwrap_or("no reason given").to_string();
    }

    truncate_body(body)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
