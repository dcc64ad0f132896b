//! Cached dataset manager
//!
//! Owns the persisted dataset's lifecycle. The dataset (`events.jsonl`) and
//! its production timestamp (`events.timestamp`) are only ever replaced
//! wholesale by a refresh, each through an atomic temp-file rename. Refreshes
//! are serialized by an async mutex; readers never wait on it unless they
//! need a refresh themselves.
//!
//! Corrupt or missing state always degrades toward a refresh. Only a failure
//! to write the new state is reported to the caller.

use super::combiner::combine;
use super::enrichment::EnrichmentEngine;
use super::lookup_store::LookupStore;
use super::metadata_client::MetadataLookup;
use crate::error::AggResult;
use crate::sources::{fetch_all, SourceAdapter};
use chrono::{DateTime, Duration, Utc};
use gigboard_common::events::{EventBus, GigEvent};
use gigboard_common::persist::{read_json_lines, write_atomic, write_json_lines};
use gigboard_common::{time, EventRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const DATASET_FILE: &str = "events.jsonl";
pub const TIMESTAMP_FILE: &str = "events.timestamp";
pub const LOOKUP_FILE: &str = "performers.jsonl";

/// Locations of the persisted files inside the data folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub dataset: PathBuf,
    pub timestamp: PathBuf,
    pub lookup: PathBuf,
}

impl CachePaths {
    pub fn in_folder(data_folder: &Path) -> Self {
        Self {
            dataset: data_folder.join(DATASET_FILE),
            timestamp: data_folder.join(TIMESTAMP_FILE),
            lookup: data_folder.join(LOOKUP_FILE),
        }
    }
}

pub struct CacheManager {
    paths: CachePaths,
    freshness: Duration,
    sources: Vec<Arc<dyn SourceAdapter>>,
    engine: EnrichmentEngine,
    event_bus: EventBus,
    refresh_lock: Mutex<()>,
}

impl CacheManager {
    pub fn new(
        data_folder: &Path,
        freshness: Duration,
        sources: Vec<Arc<dyn SourceAdapter>>,
        lookup: Arc<dyn MetadataLookup>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            paths: CachePaths::in_folder(data_folder),
            freshness,
            sources,
            engine: EnrichmentEngine::new(lookup, event_bus.clone()),
            event_bus,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Whether the persisted dataset must be rebuilt before serving
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(time::now())
    }

    /// `is_stale` evaluated at an explicit instant
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        if !self.paths.dataset.exists() {
            return true;
        }
        match self.last_updated() {
            Some(produced_at) => time::is_older_than(produced_at, self.freshness, now),
            None => true,
        }
    }

    /// When the persisted dataset was produced, if known
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = std::fs::read_to_string(&self.paths.timestamp).ok()?;
        let parsed = time::parse_timestamp(&raw);
        if parsed.is_none() {
            warn!(path = %self.paths.timestamp.display(), "Unparseable cache timestamp");
        }
        parsed
    }

    /// Serve the dataset, refreshing first when forced or stale
    pub async fn read(&self, force: bool) -> AggResult<Vec<EventRecord>> {
        if !force && !self.is_stale() {
            match self.load_dataset() {
                Ok(records) => return Ok(records),
                Err(e) => warn!(error = %e, "Cached dataset unreadable, refreshing"),
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another reader may have refreshed while we waited
        if !force && !self.is_stale() {
            if let Ok(records) = self.load_dataset() {
                return Ok(records);
            }
        }
        self.run_refresh().await
    }

    /// Rebuild, persist and return the dataset unconditionally
    pub async fn refresh(&self) -> AggResult<Vec<EventRecord>> {
        let _guard = self.refresh_lock.lock().await;
        self.run_refresh().await
    }

    /// Load the persisted dataset as-is
    pub fn load_dataset(&self) -> AggResult<Vec<EventRecord>> {
        Ok(read_json_lines(&self.paths.dataset)?)
    }

    /// Full pipeline; caller holds `refresh_lock`
    async fn run_refresh(&self) -> AggResult<Vec<EventRecord>> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, sources = self.sources.len(), "Refreshing dataset");
        self.event_bus.emit_lossy(GigEvent::RefreshStarted {
            run_id,
            source_count: self.sources.len(),
            timestamp: time::now(),
        });

        let batches = fetch_all(&self.sources, &self.event_bus, run_id).await;

        let combined = combine(batches);
        self.event_bus.emit_lossy(GigEvent::Combined {
            run_id,
            record_count: combined.records.len(),
            dropped_count: combined.dropped,
        });

        let mut records = combined.records;
        let mut store = LookupStore::load(&self.paths.lookup)?;
        let report = self.engine.enrich(&mut records, &mut store, run_id).await?;

        write_json_lines(&self.paths.dataset, &records)?;
        let produced_at = time::now();
        write_atomic(&self.paths.timestamp, time::format_timestamp(produced_at).as_bytes())?;

        info!(
            run_id = %run_id,
            records = records.len(),
            lookups = report.lookups,
            "Dataset refreshed"
        );
        self.event_bus.emit_lossy(GigEvent::RefreshCompleted {
            run_id,
            record_count: records.len(),
            lookups: report.lookups,
            timestamp: produced_at,
        });

        Ok(records)
    }
}
