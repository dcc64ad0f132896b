//! Configuration resolution for gigboard-agg
//!
//! Settings come from three tiers, highest priority first:
//! command line → environment → TOML → built-in defaults.

use crate::error::{AggError, AggResult};
use crate::sources::{CalendarSource, JsonFileSource, SourceAdapter, WixWarmupSource};
use chrono::Duration;
use gigboard_common::config::{
    default_config_path, load_toml_config_or_default, resolve_data_folder, LookupConfig,
    SourceConfig, TomlConfig,
};
use gigboard_common::time;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable overriding the freshness threshold
pub const FRESHNESS_ENV: &str = "GIGBOARD_FRESHNESS_HOURS";

/// Fully resolved aggregator settings
#[derive(Debug, Clone)]
pub struct AggSettings {
    pub data_folder: PathBuf,
    pub freshness: Duration,
    pub lookup: LookupConfig,
    pub sources: Vec<SourceConfig>,
}

impl AggSettings {
    /// Resolve settings from CLI overrides, environment and TOML
    pub fn resolve(cli_data_folder: Option<&Path>, cli_config: Option<&Path>) -> Self {
        let config_path = cli_config.map(Path::to_path_buf).or_else(default_config_path);
        let toml_config = load_toml_config_or_default(config_path.as_deref());
        Self::from_toml(cli_data_folder, toml_config)
    }

    pub fn from_toml(cli_data_folder: Option<&Path>, toml_config: TomlConfig) -> Self {
        let data_folder = resolve_data_folder(cli_data_folder, &toml_config);
        let freshness_hours = resolve_freshness_hours(&toml_config);
        info!(
            data_folder = %data_folder.display(),
            freshness_hours,
            sources = toml_config.sources.len(),
            "Resolved settings"
        );

        Self {
            data_folder,
            freshness: time::hours(freshness_hours),
            lookup: toml_config.lookup,
            sources: toml_config.sources,
        }
    }
}

/// Freshness threshold in hours: ENV → TOML
fn resolve_freshness_hours(toml_config: &TomlConfig) -> u64 {
    if let Ok(raw) = std::env::var(FRESHNESS_ENV) {
        match raw.trim().parse::<u64>() {
            Ok(hours) => {
                info!("Freshness threshold loaded from environment variable");
                return hours;
            }
            Err(_) => warn!("Ignoring invalid {}={:?}", FRESHNESS_ENV, raw),
        }
    }
    toml_config.cache.freshness_hours
}

/// Build the configured source adapters, sharing one HTTP client
pub fn build_sources(configs: &[SourceConfig], user_agent: &str) -> AggResult<Vec<Arc<dyn SourceAdapter>>> {
    let http_client = reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| AggError::Config(format!("HTTP client: {}", e)))?;

    let mut seen: Vec<&str> = Vec::new();
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(configs.len());

    for config in configs {
        if seen.contains(&config.name()) {
            return Err(AggError::Config(format!("duplicate source name '{}'", config.name())));
        }
        seen.push(config.name());

        let adapter: Arc<dyn SourceAdapter> = match config {
            SourceConfig::JsonFile { name, path } => Arc::new(JsonFileSource::new(name.as_str(), path.as_path())),
            SourceConfig::Calendar {
                name,
                venue,
                calendar_id,
                api_key,
                image_url,
                horizon_days,
            } => Arc::new(CalendarSource::new(
                name.as_str(),
                venue.as_str(),
                calendar_id.as_str(),
                api_key.as_str(),
                image_url.clone(),
                *horizon_days,
                http_client.clone(),
            )),
            SourceConfig::Wix { name, venue, url } => Arc::new(WixWarmupSource::new(
                name.as_str(),
                venue.as_str(),
                url.as_str(),
                http_client.clone(),
            )),
        };
        adapters.push(adapter);
    }

    if adapters.is_empty() {
        warn!("No sources configured; refreshes will produce an empty dataset");
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigboard_common::config::CacheConfig;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_freshness_env_overrides_toml() {
        let toml_config = TomlConfig { cache: CacheConfig { freshness_hours: 6 }, ..Default::default() };

        std::env::set_var(FRESHNESS_ENV, "48");
        assert_eq!(resolve_freshness_hours(&toml_config), 48);

        std::env::set_var(FRESHNESS_ENV, "soon");
        assert_eq!(resolve_freshness_hours(&toml_config), 6);

        std::env::remove_var(FRESHNESS_ENV);
        assert_eq!(resolve_freshness_hours(&toml_config), 6);
    }

    #[test]
    fn test_build_sources_in_config_order() {
        let configs = vec![
            SourceConfig::JsonFile { name: "gilman".to_string(), path: PathBuf::from("/srv/gilman.json") },
            SourceConfig::Wix {
                name: "elis".to_string(),
                venue: "Eli's Mile High Club".to_string(),
                url: "https://www.elismilehighclub.com/".to_string(),
            },
        ];

        let adapters = build_sources(&configs, "Gigboard-test/0.1").unwrap();
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["gilman", "elis"]);
    }

    #[test]
    fn test_duplicate_source_names_rejected() {
        let configs = vec![
            SourceConfig::JsonFile { name: "gilman".to_string(), path: PathBuf::from("/a.json") },
            SourceConfig::JsonFile { name: "gilman".to_string(), path: PathBuf::from("/b.json") },
        ];
        assert!(matches!(build_sources(&configs, "Gigboard-test/0.1"), Err(AggError::Config(_))));
    }
}
