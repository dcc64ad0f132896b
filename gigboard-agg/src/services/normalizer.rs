//! Record normalizer
//!
//! Enforces the canonical `EventRecord` shape on adapter output. A record
//! without a usable start time is rejected; everything else degrades to a
//! valid default (source name as venue, empty headliner, no end time, no
//! URLs).

use crate::sources::{split_performers, RawEvent};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use gigboard_common::time::parse_instant;
use gigboard_common::EventRecord;
use thiserror::Error;

/// Naive formats accepted for listings published in venue-local time
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing start time")]
    MissingStart,

    #[error("unparseable start time: {0}")]
    InvalidStart(String),
}

/// Convert one raw record to the canonical schema
///
/// `source` names the adapter that produced the record and stands in for a
/// missing venue.
pub fn normalize(raw: RawEvent, source: &str) -> Result<EventRecord, NormalizeError> {
    let venue = non_blank(raw.venue).unwrap_or_else(|| source.trim().to_string());

    let start_text = non_blank(raw.start).ok_or(NormalizeError::MissingStart)?;
    let start = parse_event_time(&start_text).ok_or(NormalizeError::InvalidStart(start_text))?;

    // An unparseable end is dropped, never guessed
    let end = non_blank(raw.end).and_then(|t| parse_event_time(&t));

    let title = raw.title.map(|t| t.trim().to_string()).unwrap_or_default();

    let mut headliner = raw.headliner.map(|h| h.trim().to_string()).unwrap_or_default();
    let mut supporting: Vec<String> = raw
        .supporting
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if headliner.is_empty() && supporting.is_empty() && !title.is_empty() {
        (headliner, supporting) = split_performers(&title, ",");
    }

    Ok(EventRecord {
        venue,
        title,
        start,
        end,
        headliner,
        supporting,
        image_url: non_blank(raw.image_url),
        event_url: non_blank(raw.event_url),
        notes: raw.notes.unwrap_or_default(),
    })
}

/// Parse an event time: RFC 3339, or a naive time in the local zone
pub fn parse_event_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Some(instant) = parse_instant(raw) {
        return Some(instant);
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())?;
    // Ambiguous wall times (DST fall-back) take the earlier instant; times
    // skipped by spring-forward do not exist and are rejected.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.fixed_offset())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
