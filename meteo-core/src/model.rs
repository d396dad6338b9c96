use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting anything outside [-90, 90] / [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        let coords = Self { latitude, longitude };
        coords.validate()?;
        Ok(coords)
    }

    pub fn validate(&self) -> Result<(), WeatherError> {
        // NaN fails both range checks.
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(WeatherError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions for one coordinate, as reported by Open-Meteo.
///
/// Every measurement is optional: a value the provider left out, sent as
/// `null` or sent as something other than a number is `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: Option<DateTime<Utc>>,

    pub temperature_celsius: Option<f64>,
    pub apparent_temperature_celsius: Option<f64>,
    pub relative_humidity_percent: Option<f64>,
    pub cloud_cover_percent: Option<f64>,
    pub wind_speed_meters_per_second: Option<f64>,
    pub wind_direction_degrees: Option<f64>,
    pub pressure_msl_hectopascals: Option<f64>,

    pub precipitation_millimeters: Option<f64>,
    pub rain_millimeters: Option<f64>,
    pub showers_millimeters: Option<f64>,
    pub snowfall_centimeters: Option<f64>,
    pub weather_code: Option<u8>,
    pub surface_pressure_hectopascals: Option<f64>,
    pub wind_gusts_meters_per_second: Option<f64>,
}

impl WeatherObservation {
    /// An observation at `coords` with every measurement missing.
    pub fn empty_at(coords: Coordinates) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
            ..Default::default()
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather_code.map(WeatherCondition::from_wmo_code)
    }
}

impl fmt::Display for WeatherObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeatherObservation{{lat={:.4}, lon={:.4}, temp={}°C, humidity={}%, wind={}m/s}}",
            self.latitude,
            self.longitude,
            OneDecimal(self.temperature_celsius),
            OneDecimal(self.relative_humidity_percent),
            OneDecimal(self.wind_speed_meters_per_second),
        )
    }
}

/// Renders an optional measurement with one decimal, or `n/a`.
#[derive(Debug, Clone, Copy)]
pub struct OneDecimal(pub Option<f64>);

impl fmt::Display for OneDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.1}"),
            None => f.write_str("n/a"),
        }
    }
}

/// Weather condition derived from a WMO interpretation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    Snow,
    SnowGrains,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    ThunderstormWithHail,
    Unknown,
}

impl WeatherCondition {
    /// See <https://open-meteo.com/en/docs> for the code table.
    pub const fn from_wmo_code(code: u8) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 => Self::Snow,
            77 => Self::SnowGrains,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::FreezingDrizzle => "Freezing drizzle",
            Self::Rain => "Rain",
            Self::FreezingRain => "Freezing rain",
            Self::Snow => "Snow",
            Self::SnowGrains => "Snow grains",
            Self::RainShowers => "Rain showers",
            Self::SnowShowers => "Snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormWithHail => "Thunderstorm with hail",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
