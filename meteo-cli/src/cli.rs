use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Confirm, CustomType, Text};
use meteo_core::{
    Config, Coordinates, WeatherClient, WeatherObservation, client_from_config, model::OneDecimal,
};
use tracing::{error, info};

/// Locations shown by `meteo demo`.
const DEMO_LOCATIONS: &[(&str, Coordinates)] = &[
    (
        "Beijing",
        Coordinates {
            latitude: 39.9042,
            longitude: 116.4074,
        },
    ),
    (
        "New York",
        Coordinates {
            latitude: 40.7128,
            longitude: -74.0060,
        },
    ),
];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Current weather from Open-Meteo")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather for a saved location or explicit coordinates.
    Current {
        /// Saved location name; the default location when omitted.
        #[arg(conflicts_with = "lat")]
        name: Option<String>,

        /// Latitude in decimal degrees.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Print the observation as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Save a named location interactively.
    Configure,

    /// List saved locations.
    Locations,

    /// Show current weather for Beijing and New York.
    Demo,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Current {
                name,
                lat,
                lon,
                json,
            } => {
                let config = Config::load()?;
                let (label, coords) = resolve_target(&config, name.as_deref(), lat, lon)?;
                let client = client_from_config(&config)?;

                let observation = client
                    .fetch_current_weather(coords.latitude, coords.longitude)
                    .await
                    .with_context(|| format!("Failed to fetch current weather for {label}"))?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&observation)?);
                } else {
                    print!("{}", render_observation(&label, &observation));
                }
            }
            Command::Configure => configure()?,
            Command::Locations => {
                let config = Config::load()?;
                print!("{}", render_locations(&config));
            }
            Command::Demo => {
                let config = Config::load()?;
                let client = client_from_config(&config)?;
                demo(client.as_ref()).await;
            }
        }

        Ok(())
    }
}

/// Pick coordinates from flags, a named location or the configured default.
fn resolve_target(
    config: &Config,
    name: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<(String, Coordinates)> {
    match (name, lat, lon) {
        (_, Some(lat), Some(lon)) => {
            let coords = Coordinates::new(lat, lon)?;
            Ok((coords.to_string(), coords))
        }
        (Some(name), _, _) => {
            let coords = config.location(name).ok_or_else(|| {
                anyhow!(
                    "No saved location named '{name}'.\n\
                     Hint: run `meteo locations` to list them or `meteo configure` to add one."
                )
            })?;
            Ok((name.to_string(), coords))
        }
        _ => {
            let (name, coords) = config.default_location()?;
            Ok((name.to_string(), coords))
        }
    }
}

fn render_observation(label: &str, obs: &WeatherObservation) -> String {
    let condition = obs
        .condition()
        .map_or_else(|| "n/a".to_string(), |c| c.to_string());

    let wind_direction = obs
        .wind_direction_degrees
        .map_or_else(|| "n/a".to_string(), |d| format!("{d:.0}°"));

    let observed = obs.observed_at.map_or_else(
        || "n/a".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M %:z").to_string(),
    );

    format!(
        "{label} Weather ({:.4}, {:.4}):\n\
         Temperature: {}°C\n\
         Feels like: {}°C\n\
         Humidity: {}%\n\
         Cloud cover: {}%\n\
         Wind Speed: {} m/s from {wind_direction}\n\
         Pressure: {} hPa\n\
         Condition: {condition}\n\
         Observed at: {observed}\n",
        obs.latitude,
        obs.longitude,
        OneDecimal(obs.temperature_celsius),
        OneDecimal(obs.apparent_temperature_celsius),
        OneDecimal(obs.relative_humidity_percent),
        OneDecimal(obs.cloud_cover_percent),
        OneDecimal(obs.wind_speed_meters_per_second),
        OneDecimal(obs.pressure_msl_hectopascals),
    )
}

fn render_locations(config: &Config) -> String {
    if config.locations.is_empty() {
        return "No saved locations. Run `meteo configure` to add one.\n".to_string();
    }

    let mut out = String::new();
    for (name, coords) in &config.locations {
        let marker = if config.default_location.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        out.push_str(&format!("{marker} {name}: {coords}\n"));
    }
    out
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let name = Text::new("Location name:")
        .prompt()
        .context("Failed to read location name")?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Location name must not be empty."));
    }

    let latitude = CustomType::<f64>::new("Latitude (-90..=90):")
        .with_error_message("Please enter a decimal number")
        .prompt()
        .context("Failed to read latitude")?;
    let longitude = CustomType::<f64>::new("Longitude (-180..=180):")
        .with_error_message("Please enter a decimal number")
        .prompt()
        .context("Failed to read longitude")?;

    let coords = Coordinates::new(latitude, longitude)?;
    let had_default = config.default_location.is_some();
    config.upsert_location(name, coords);

    if had_default
        && config.default_location.as_deref() != Some(name)
        && Confirm::new("Make this the default location?")
            .with_default(false)
            .prompt()
            .context("Failed to read confirmation")?
    {
        config.set_default_location(name)?;
    }

    config.save()?;
    info!(location = name, "Saved location");
    println!(
        "Saved '{name}' ({coords}) to {}",
        Config::config_file_path()?.display()
    );

    Ok(())
}

async fn demo(client: &dyn WeatherClient) {
    for (i, (label, coords)) in DEMO_LOCATIONS.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match client
            .fetch_current_weather(coords.latitude, coords.longitude)
            .await
        {
            Ok(obs) => print!("{}", render_observation(label, &obs)),
            Err(e) => error!(location = *label, "Error fetching weather: {e}"),
        }
    }
}
