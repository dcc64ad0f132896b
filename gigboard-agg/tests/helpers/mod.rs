//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use gigboard_agg::services::{LookupError, MetadataLookup, PerformerMetadata};
use gigboard_agg::sources::{RawEvent, SourceAdapter, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Metadata lookup answering from a fixed table and counting calls per name
#[derive(Default)]
pub struct FakeLookup {
    known: HashMap<String, PerformerMetadata>,
    failing: Vec<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artist(mut self, name: &str, url: &str) -> Self {
        self.known.insert(
            name.to_string(),
            PerformerMetadata {
                url: Some(url.to_string()),
                genre: Some("punk".to_string()),
                tags: vec!["punk".to_string(), "bay area".to_string()],
                location: Some("Oakland, United States".to_string()),
            },
        );
        self
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl MetadataLookup for FakeLookup {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn lookup(&self, performer: &str) -> Result<PerformerMetadata, LookupError> {
        *self.calls.lock().unwrap().entry(performer.to_string()).or_insert(0) += 1;
        if self.failing.iter().any(|n| n == performer) {
            return Err(LookupError::NetworkError("connection reset".to_string()));
        }
        Ok(self.known.get(performer).cloned().unwrap_or_default())
    }
}

/// Source adapter returning fixed records, or failing
pub struct FakeSource {
    name: String,
    records: Option<Vec<RawEvent>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn ok(name: &str, records: Vec<RawEvent>) -> Self {
        Self { name: name.to_string(), records: Some(records), fetches: AtomicUsize::new(0) }
    }

    pub fn failing(name: &str) -> Self {
        Self { name: name.to_string(), records: None, fetches: AtomicUsize::new(0) }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.records
            .clone()
            .ok_or_else(|| SourceError::Http(503, format!("https://{}.example", self.name)))
    }
}

/// Raw listing with explicit performers
pub fn raw_event(venue: &str, start: &str, headliner: &str, supporting: &[&str]) -> RawEvent {
    RawEvent {
        venue: Some(venue.to_string()),
        title: Some(
            std::iter::once(headliner)
                .chain(supporting.iter().copied())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        start: Some(start.to_string()),
        headliner: Some(headliner.to_string()),
        supporting: supporting.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}
