//! Enrichment engine
//!
//! Appends one notes block per performer to every event. Performers are
//! visited in a fixed order (events in dataset order, headliner first, then
//! supporting acts in billing order) and resolved through the lookup store,
//! so each distinct name costs at most one external lookup per run.

use super::lookup_store::LookupStore;
use super::metadata_client::MetadataLookup;
use crate::error::AggResult;
use gigboard_common::events::{EventBus, GigEvent};
use gigboard_common::models::TAG_SEPARATOR;
use gigboard_common::{EventRecord, LookupEntry};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Marker printed for a missing metadata field
pub const FALLBACK_MARKER: &str = "N/A";

/// Counters for one enrichment run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Performer slots resolved (blank names excluded)
    pub performers: usize,
    /// External lookups performed
    pub lookups: usize,
    /// Performers resolved as not found
    pub not_found: usize,
}

pub struct EnrichmentEngine {
    lookup: Arc<dyn MetadataLookup>,
    event_bus: EventBus,
}

impl EnrichmentEngine {
    pub fn new(lookup: Arc<dyn MetadataLookup>, event_bus: EventBus) -> Self {
        Self { lookup, event_bus }
    }

    /// Enrich `records` in place, growing `store` on misses
    ///
    /// Fails only when the store cannot be persisted.
    pub async fn enrich(
        &self,
        records: &mut [EventRecord],
        store: &mut LookupStore,
        run_id: Uuid,
    ) -> AggResult<EnrichmentReport> {
        let mut report = EnrichmentReport::default();
        let total = records.len();

        for (position, record) in records.iter_mut().enumerate() {
            let names: Vec<String> = record
                .performers()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();

            for name in names {
                let resolution = store.get_or_fetch(&name, self.lookup.as_ref()).await?;
                report.performers += 1;
                if resolution.fetched {
                    report.lookups += 1;
                }
                let found = resolution.entry.is_found();
                if !found {
                    report.not_found += 1;
                }

                record.append_note(&format_block(&name, &resolution.entry));

                debug!(performer = %name, fetched = resolution.fetched, found, "Performer resolved");
                self.event_bus.emit_lossy(GigEvent::PerformerResolved {
                    run_id,
                    name,
                    fetched: resolution.fetched,
                    found,
                    current: position + 1,
                    total,
                });
            }
        }

        info!(
            events = total,
            performers = report.performers,
            lookups = report.lookups,
            not_found = report.not_found,
            store_entries = store.len(),
            "Enrichment complete"
        );
        Ok(report)
    }
}

/// Notes block for one resolved performer
pub fn format_block(name: &str, entry: &LookupEntry) -> String {
    let Some(url) = entry.url.as_deref().filter(|_| entry.is_found()) else {
        return format!("{}: No page found", name);
    };

    let tags = entry.tags.join(TAG_SEPARATOR);
    format!(
        "{}: {}\nGenre: {}\nTags: {}\nLocation: {}",
        name,
        url,
        or_fallback(entry.genre.as_deref()),
        or_fallback(Some(tags.as_str())),
        or_fallback(entry.location.as_deref()),
    )
}

fn or_fallback(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(FALLBACK_MARKER)
}
