//! gigboard-agg library interface
//!
//! Venue sources, the combiner, the performer lookup store and enrichment
//! engine, and the cache manager that ties them together.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;

pub use crate::error::{AggError, AggResult};
pub use crate::services::CacheManager;

use gigboard_common::events::EventBus;
use services::MusicBrainzLookup;
use std::sync::Arc;

/// Build a cache manager wired to the configured sources and MusicBrainz
pub fn build_cache_manager(settings: &config::AggSettings, event_bus: EventBus) -> AggResult<CacheManager> {
    let sources = config::build_sources(&settings.sources, &settings.lookup.user_agent)?;
    let lookup = MusicBrainzLookup::new(&settings.lookup)
        .map_err(|e| AggError::Config(format!("MusicBrainz client: {}", e)))?;

    Ok(CacheManager::new(
        &settings.data_folder,
        settings.freshness,
        sources,
        Arc::new(lookup),
        event_bus,
    ))
}
