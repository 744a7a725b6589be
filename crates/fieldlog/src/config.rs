//! Configuration management for fieldlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::record::{Coordinates, PLACEHOLDER_LATITUDE, PLACEHOLDER_LONGITUDE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fieldlog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "records.db";

/// Default media directory name.
const MEDIA_DIR_NAME: &str = "media";

/// Default record table.
const DEFAULT_TABLE: &str = "user_details";

/// Default Cloudinary upload API base.
const DEFAULT_CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIELDLOG_`, `__` between sections)
/// 2. TOML config file at `~/.config/fieldlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store configuration.
    pub store: StoreConfig,
    /// Media store configuration.
    pub media: MediaConfig,
    /// Capture configuration.
    pub capture: CaptureConfig,
    /// Report upload configuration.
    pub reports: ReportsConfig,
}

/// Which record store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Hosted table behind a PostgREST API.
    Rest,
    /// Bespoke multipart endpoint for inserts, hosted table for reads.
    Form,
    /// Local `SQLite` database.
    #[default]
    Local,
}

/// Which media store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaBackend {
    /// Cloudinary unsigned uploads.
    Cloudinary,
    /// Content-addressed local directory.
    #[default]
    Local,
}

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store implementation.
    pub backend: StoreBackend,
    /// Project URL of the hosted database (without `/rest/v1`).
    pub url: Option<String>,
    /// API key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Table holding the records.
    pub table: String,
    /// Multipart insert endpoint used by the `form` backend.
    pub form_endpoint: Option<String>,
    /// Path to the local database file.
    /// Defaults to `~/.local/share/fieldlog/records.db`
    pub database_path: Option<PathBuf>,
}

/// Media store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Media implementation.
    pub backend: MediaBackend,
    /// Cloudinary cloud name.
    pub cloud_name: Option<String>,
    /// Unsigned upload preset.
    pub upload_preset: Option<String>,
    /// Upload API base.
    pub api_base: String,
    /// Override for the base URL image fragments are resolved against.
    pub cdn_base: Option<String>,
    /// Directory for the local media store.
    /// Defaults to `~/.local/share/fieldlog/media`
    pub media_dir: Option<PathBuf>,
}

/// Capture-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Latitude used when no device fix is available.
    pub placeholder_latitude: f64,
    /// Longitude used when no device fix is available.
    pub placeholder_longitude: f64,
    /// Device-reported latitude, if the device has a fix.
    pub device_latitude: Option<f64>,
    /// Device-reported longitude, if the device has a fix.
    pub device_longitude: Option<f64>,
}

/// Report upload configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Endpoint receiving report uploads. Reports are only logged when unset.
    pub endpoint: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            url: None,
            api_key: None,
            table: DEFAULT_TABLE.to_string(),
            form_endpoint: None,
            database_path: None, // Will be resolved to default at runtime
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: MediaBackend::Local,
            cloud_name: None,
            upload_preset: None,
            api_base: DEFAULT_CLOUDINARY_API.to_string(),
            cdn_base: None,
            media_dir: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            placeholder_latitude: PLACEHOLDER_LATITUDE,
            placeholder_longitude: PLACEHOLDER_LONGITUDE,
            device_latitude: None,
            device_longitude: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FIELDLOG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FIELDLOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store.table.trim().is_empty() {
            return Err(Error::config("store.table cannot be empty"));
        }

        match self.store.backend {
            StoreBackend::Local => {}
            StoreBackend::Rest | StoreBackend::Form => {
                require_url("store.url", self.store.url.as_deref())?;
                if self.store.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::config(
                        "store.api_key is required for the rest and form backends",
                    ));
                }
                if self.store.backend == StoreBackend::Form {
                    require_url("store.form_endpoint", self.store.form_endpoint.as_deref())?;
                }
            }
        }

        if self.media.backend == MediaBackend::Cloudinary {
            if self.media.cloud_name.as_deref().map_or(true, str::is_empty) {
                return Err(Error::config(
                    "media.cloud_name is required for the cloudinary backend",
                ));
            }
            if self
                .media
                .upload_preset
                .as_deref()
                .map_or(true, str::is_empty)
            {
                return Err(Error::config(
                    "media.upload_preset is required for the cloudinary backend",
                ));
            }
            require_url("media.api_base", Some(&self.media.api_base))?;
        }

        if let Some(cdn_base) = &self.media.cdn_base {
            require_url("media.cdn_base", Some(cdn_base))?;
        }

        if !self.placeholder().is_valid() {
            return Err(Error::config(format!(
                "placeholder coordinate ({}, {}) is out of range",
                self.capture.placeholder_latitude, self.capture.placeholder_longitude
            )));
        }

        match (self.capture.device_latitude, self.capture.device_longitude) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::config(
                    "capture.device_latitude and capture.device_longitude must be set together",
                ));
            }
            (Some(latitude), Some(longitude)) => {
                if !Coordinates::new(latitude, longitude).is_valid() {
                    return Err(Error::config(format!(
                        "device coordinate ({latitude}, {longitude}) is out of range"
                    )));
                }
            }
            (None, None) => {}
        }

        if let Some(endpoint) = &self.reports.endpoint {
            require_url("reports.endpoint", Some(endpoint))?;
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the local media directory, resolving defaults if not set.
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.media
            .media_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(MEDIA_DIR_NAME))
    }

    /// Get the placeholder coordinate.
    #[must_use]
    pub fn placeholder(&self) -> Coordinates {
        Coordinates::new(
            self.capture.placeholder_latitude,
            self.capture.placeholder_longitude,
        )
    }

    /// Get the configured device fix, if any.
    #[must_use]
    pub fn device_fix(&self) -> Option<Coordinates> {
        match (self.capture.device_latitude, self.capture.device_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

fn require_url(key: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Err(Error::config(format!("{key} is required")));
    };
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::config(format!("{key} is not a valid URL ({e}): {value}")))
}
