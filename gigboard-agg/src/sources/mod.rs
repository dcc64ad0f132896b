//! Venue source adapters
//!
//! Each venue publishes its listings differently. An adapter turns one
//! venue's feed into `RawEvent`s; the normalizer then enforces the canonical
//! `EventRecord` shape. Adapters are independent of each other and run
//! concurrently during a refresh.

mod calendar;
mod json_file;
mod wix;

pub use calendar::CalendarSource;
pub use json_file::JsonFileSource;
pub use wix::WixWarmupSource;

use async_trait::async_trait;
use futures::future::join_all;
use gigboard_common::events::{EventBus, GigEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Source adapter errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0} from {1}")]
    Http(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Network(e.to_string())
    }
}

/// One listing as produced by a source adapter, before normalization
///
/// Times are strings: RFC 3339 with an offset, or a naive local date-time
/// that the normalizer localizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub headliner: Option<String>,
    #[serde(default)]
    pub supporting: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub event_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Raw output of one adapter
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub source: String,
    pub records: Vec<RawEvent>,
}

/// A venue feed
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable name used in logs and progress events
    fn name(&self) -> &str;

    /// Fetch the venue's current listings
    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError>;
}

/// Run every adapter concurrently and collect their batches
///
/// A failing adapter is logged, reported as `SourceFailed` and left out;
/// the other adapters' records are kept. Batches come back in adapter order.
pub async fn fetch_all(
    adapters: &[Arc<dyn SourceAdapter>],
    event_bus: &EventBus,
    run_id: Uuid,
) -> Vec<SourceBatch> {
    let results = join_all(adapters.iter().map(|adapter| async move {
        (adapter.name().to_string(), adapter.fetch().await)
    }))
    .await;

    let mut batches = Vec::with_capacity(results.len());
    for (source, result) in results {
        match result {
            Ok(records) => {
                info!(source = %source, records = records.len(), "Source fetched");
                event_bus.emit_lossy(GigEvent::SourceFetched {
                    run_id,
                    source: source.clone(),
                    record_count: records.len(),
                });
                batches.push(SourceBatch { source, records });
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Source failed, skipping venue for this refresh");
                event_bus.emit_lossy(GigEvent::SourceFailed {
                    run_id,
                    source,
                    error: e.to_string(),
                });
            }
        }
    }
    batches
}

/// Split a listing title into performer names
///
/// Blank pieces are dropped; the first name is the headliner.
pub fn split_performers(title: &str, separator: &str) -> (String, Vec<String>) {
    let mut names = title
        .split(separator)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    let headliner = names.next().unwrap_or_default();
    (headliner, names.collect())
}
