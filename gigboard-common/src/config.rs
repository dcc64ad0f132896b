//! Configuration loading and data folder resolution
//!
//! Data folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`GIGBOARD_DATA_FOLDER`)
//! 3. TOML config file (`data_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup: the loader warns
//! and falls back to built-in defaults.

use crate::persist::write_atomic;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "GIGBOARD_DATA_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "GIGBOARD_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the cached dataset, timestamp and lookup store
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    /// Venue sources, fetched in listed order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

/// Cached dataset settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum dataset age before a refresh is required
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { freshness_hours: default_freshness_hours() }
    }
}

/// Performer metadata lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// User-Agent sent to MusicBrainz (their policy requires a contact)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum MusicBrainz search score (0-100) accepted as a match
    #[serde(default = "default_min_score")]
    pub min_score: u8,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            min_score: default_min_score(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// One configured venue source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// JSON array of raw events on disk
    JsonFile {
        name: String,
        path: PathBuf,
    },

    /// Google Calendar v3 events feed
    Calendar {
        name: String,
        venue: String,
        calendar_id: String,
        api_key: String,
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default = "default_horizon_days")]
        horizon_days: u32,
    },

    /// Wix site publishing its event list in the warm-up data blob
    Wix {
        name: String,
        venue: String,
        url: String,
    },
}

impl SourceConfig {
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::JsonFile { name, .. }
            | SourceConfig::Calendar { name, .. }
            | SourceConfig::Wix { name, .. } => name,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_freshness_hours() -> u64 {
    24
}

fn default_user_agent() -> String {
    format!("Gigboard/{} ( gigboard@example.org )", env!("CARGO_PKG_VERSION"))
}

fn default_min_score() -> u8 {
    90
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_horizon_days() -> u32 {
    90
}

/// Resolve the data folder following the documented priority order
pub fn resolve_data_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.data_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gigboard"))
        .unwrap_or_else(|| PathBuf::from("./gigboard_data"))
}

/// Default config file path (`GIGBOARD_CONFIG`, else the user config dir)
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join("gigboard").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load a TOML config, degrading to defaults when missing or invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        warn!("No config file location available, using built-in defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        info!("Config file {} not found, using built-in defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!(
                path = %path.display(),
                sources = config.sources.len(),
                "Loaded configuration"
            );
            config
        }
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    write_atomic(path, content.as_bytes())
}
