use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinates;

pub const DEFAULT_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Forecast endpoint, overridable for testing or self-hosted instances.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Name of the location used when none is given on the command line.
    #[serde(default)]
    pub default_location: Option<String>,

    /// Example TOML:
    /// [locations.home]
    /// latitude = 52.52
    /// longitude = 13.405
    #[serde(default)]
    pub locations: BTreeMap<String, Coordinates>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            default_location: None,
            locations: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Return the default location's name and coordinates.
    pub fn default_location(&self) -> Result<(&str, Coordinates)> {
        let name = self.default_location.as_deref().ok_or_else(|| {
            anyhow!(
                "No default location configured.\n\
                 Hint: run `meteo configure` or pass --lat/--lon."
            )
        })?;

        let coords = self
            .location(name)
            .ok_or_else(|| anyhow!("Default location '{name}' is not among the saved locations."))?;

        Ok((name, coords))
    }

    pub fn location(&self, name: &str) -> Option<Coordinates> {
        self.locations.get(name).copied()
    }

    /// Make an already saved location the default.
    pub fn set_default_location(&mut self, name: &str) -> Result<()> {
        if !self.locations.contains_key(name) {
            return Err(anyhow!("Unknown location '{name}'."));
        }
        self.default_location = Some(name.to_string());
        Ok(())
    }

    /// Set/replace a saved location; the first one saved becomes the default.
    pub fn upsert_location(&mut self, name: &str, coords: Coordinates) {
        self.locations.insert(name.to_string(), coords);

        if self.default_location.is_none() {
            self.default_location = Some(name.to_string());
        }
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        for (name, coords) in &cfg.locations {
            coords
                .validate()
                .with_context(|| format!("Saved location '{name}' in {}", path.display()))?;
        }

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteo", "meteo-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
