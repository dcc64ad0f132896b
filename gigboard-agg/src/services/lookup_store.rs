//! Performer lookup store
//!
//! Persistent map from performer name to the metadata found for it, or to
//! an explicit "no page found" result. Presence of a name is the single
//! source of truth for "have we looked this performer up": a stored name is
//! never fetched again and never overwritten.
//!
//! The only mutation is `get_or_fetch`, which persists the whole store
//! before returning whenever it adds an entry. A crash loses at most the
//! lookup in flight.

use super::metadata_client::MetadataLookup;
use crate::error::AggResult;
use chrono::Utc;
use gigboard_common::persist::{read_json_lines_lenient, write_json_lines};
use gigboard_common::models::clean_tags;
use gigboard_common::LookupEntry;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome of resolving one name
#[derive(Debug, Clone)]
pub struct Resolution {
    pub entry: LookupEntry,
    /// True when this call performed the external lookup
    pub fetched: bool,
}

#[derive(Debug)]
pub struct LookupStore {
    path: PathBuf,
    /// Rows in insertion order, as persisted
    entries: Vec<LookupEntry>,
    index: HashMap<String, usize>,
}

impl LookupStore {
    /// Empty store persisting to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Load the store from `path`, or start empty when the file is absent
    ///
    /// Malformed rows are skipped. When a name appears more than once the
    /// first row wins.
    pub fn load(path: impl Into<PathBuf>) -> AggResult<Self> {
        let mut store = Self::new(path);
        if !store.path.exists() {
            info!(path = %store.path.display(), "No lookup store yet, starting empty");
            return Ok(store);
        }

        let (rows, skipped): (Vec<LookupEntry>, usize) = read_json_lines_lenient(&store.path)?;
        let mut duplicates = 0;
        for mut row in rows {
            row.name = row.name.trim().to_string();
            if row.name.is_empty() || store.index.contains_key(&row.name) {
                duplicates += 1;
                continue;
            }
            store.insert(row);
        }

        if skipped > 0 || duplicates > 0 {
            warn!(
                path = %store.path.display(),
                skipped,
                duplicates,
                "Lookup store had unusable rows"
            );
        }
        info!(path = %store.path.display(), entries = store.len(), "Loaded lookup store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LookupEntry> {
        self.index.get(name.trim()).map(|&i| &self.entries[i])
    }

    /// Resolve `name`, fetching and persisting on a miss
    ///
    /// A failed lookup is stored as not-found. Only a failure to persist the
    /// store is returned as an error.
    pub async fn get_or_fetch(&mut self, name: &str, lookup: &dyn MetadataLookup) -> AggResult<Resolution> {
        let name = name.trim();
        if let Some(entry) = self.get(name) {
            return Ok(Resolution { entry: entry.clone(), fetched: false });
        }

        let entry = match lookup.lookup(name).await {
            Ok(metadata) => LookupEntry {
                name: name.to_string(),
                url: metadata.url.filter(|u| !u.trim().is_empty()),
                genre: metadata.genre,
                tags: clean_tags(metadata.tags),
                location: metadata.location,
                looked_up_at: Some(Utc::now()),
            },
            Err(e) => {
                warn!(performer = %name, service = lookup.name(), error = %e, "Lookup failed, recording as not found");
                LookupEntry::not_found(name)
            }
        };

        self.insert(entry.clone());
        write_json_lines(&self.path, &self.entries)?;

        Ok(Resolution { entry, fetched: true })
    }

    fn insert(&mut self, entry: LookupEntry) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }
}
