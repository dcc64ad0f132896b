//! Shared record types
//!
//! `EventRecord` is the canonical show listing every source adapter is
//! normalized into. `LookupEntry` is one row of the performer lookup store.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of supporting-act slots exposed to presentation code
pub const SUPPORTING_SLOTS: usize = 3;

/// Separator used when tags are persisted as a single string
pub const TAG_SEPARATOR: &str = ", ";

/// One canonical show listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Venue display name
    pub venue: String,
    /// Listing title as published by the source
    #[serde(default)]
    pub title: String,
    /// Show start (doors or set time, whichever the source publishes)
    pub start: DateTime<FixedOffset>,
    /// Show end, only when the source publishes one
    #[serde(default)]
    pub end: Option<DateTime<FixedOffset>>,
    /// Headlining act; empty when the source listing had no performers
    #[serde(default)]
    pub headliner: String,
    /// Supporting acts in billing order
    #[serde(default)]
    pub supporting: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub event_url: Option<String>,
    /// Append-only enrichment notes
    #[serde(default)]
    pub notes: String,
}

impl EventRecord {
    /// Performer names in billing order (headliner first)
    pub fn performers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.headliner.as_str()).chain(self.supporting.iter().map(String::as_str))
    }

    /// Supporting acts flattened to the fixed slot layout used by listings
    ///
    /// Acts beyond the last slot are dropped here only; the record itself
    /// keeps the full list.
    pub fn supporting_slots(&self) -> [Option<&str>; SUPPORTING_SLOTS] {
        let mut slots = [None; SUPPORTING_SLOTS];
        for (slot, act) in slots.iter_mut().zip(self.supporting.iter()) {
            *slot = Some(act.as_str());
        }
        slots
    }

    /// Append a text block to the notes, newline-separated
    pub fn append_note(&mut self, block: &str) {
        if !self.notes.is_empty() && !self.notes.ends_with('\n') {
            self.notes.push('\n');
        }
        self.notes.push_str(block);
    }
}

/// One row of the performer lookup store
///
/// An entry with `url == None` records a lookup that found no page. It is a
/// definitive result and is never fetched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// Performer name (trimmed, case preserved)
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_tags",
        deserialize_with = "deserialize_tags"
    )]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub looked_up_at: Option<DateTime<Utc>>,
}

impl LookupEntry {
    /// Entry recording that no page exists for `name`
    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            genre: None,
            tags: Vec::new(),
            location: None,
            looked_up_at: Some(Utc::now()),
        }
    }

    pub fn is_found(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

fn serialize_tags<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tags.join(TAG_SEPARATOR))
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(split_tags(raw.as_deref().unwrap_or_default()))
}

/// Make tags safe for the delimited column
///
/// Commas become spaces and inner whitespace collapses, so the list reloads
/// unchanged through `split_tags`. Blanks and repeats are dropped.
pub fn clean_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ");
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

/// Split a delimited tag string, dropping blanks and repeats
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
