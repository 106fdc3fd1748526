//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```yaml
//! store_path: /srv/irmii/hurricane_helene_news.csv
//! geocoder:
//!   user_agent: helene_news_app
//!   timeout_secs: 5
//! http:
//!   max_retries: 3
//! ```
//!
//! Command-line flags override the file (see [`crate::cli`]).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Shared CSV table holding every submission.
    pub store_path: PathBuf,
    /// Town-to-county CSV (`Town`, `County` columns).
    pub towns_path: PathBuf,
    /// GeoNames US postal code dump (`US.txt`).
    pub postal_path: PathBuf,
    /// State used when the form leaves it empty.
    pub default_state: String,
    pub geocoder: GeocoderConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/hurricane_helene_news.csv"),
            towns_path: PathBuf::from("data/townsandcounties.csv"),
            postal_path: PathBuf::from("data/US.txt"),
            default_state: "North Carolina".to_string(),
            geocoder: GeocoderConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Settings for the Nominatim geocoder.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Search endpoint, e.g. `https://nominatim.openstreetmap.org/search`.
    pub endpoint: String,
    /// Nominatim requires an identifying user agent.
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Minimum spacing between requests; values under one second are raised.
    pub min_delay_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: "helene_news_app".to_string(),
            timeout_secs: 10,
            min_delay_ms: 1000,
        }
    }
}

/// Settings for article downloads.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Retries after the first failed download.
    pub max_retries: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("helene_news/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 20,
            max_retries: 2,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Load the file if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
