use thiserror::Error;

/// Failures of a single current-weather request. None of them are retried.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Connection, timeout or body read failure.
    #[error("Transport error talking to Open-Meteo: {0}")]
    Transport(#[source] reqwest::Error),

    /// Open-Meteo answered with something other than 200.
    #[error("Open-Meteo request failed with HTTP {code}: {reason}")]
    HttpStatus { code: u16, reason: String },

    /// The body was not valid JSON.
    #[error("Failed to parse Open-Meteo response JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "Invalid coordinates ({latitude}, {longitude}): latitude must be -90..=90, longitude -180..=180"
    )]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl WeatherError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WeatherError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
