//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - The Open-Meteo current weather client
//! - The observation model, with explicit missing values
//! - Configuration (saved locations, endpoint, timeouts)
//!
//! It is used by `meteo-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use client::{OpenMeteoClient, WeatherClient, client_from_config};
pub use config::Config;
pub use error::WeatherError;
pub use model::{Coordinates, WeatherCondition, WeatherObservation};
