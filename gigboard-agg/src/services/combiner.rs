//! Multi-source combiner
//!
//! Normalizes every source batch, drops records without a valid start time,
//! and concatenates the rest into one dataset ordered by start. Ties are
//! broken by venue then title so the result does not depend on the order the
//! batches arrive in.

use super::normalizer::normalize;
use crate::sources::SourceBatch;
use gigboard_common::EventRecord;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Combiner output
#[derive(Debug, Clone, Default)]
pub struct Combined {
    pub records: Vec<EventRecord>,
    /// Records rejected by the normalizer
    pub dropped: usize,
}

pub fn combine(batches: Vec<SourceBatch>) -> Combined {
    let mut combined = Combined::default();

    for batch in batches {
        for raw in batch.records {
            match normalize(raw, &batch.source) {
                Ok(record) => combined.records.push(record),
                Err(e) => {
                    debug!(source = %batch.source, error = %e, "Dropping record");
                    combined.dropped += 1;
                }
            }
        }
    }

    combined.records.sort_by(listing_order);

    info!(
        records = combined.records.len(),
        dropped = combined.dropped,
        "Combined source batches"
    );
    combined
}

fn listing_order(a: &EventRecord, b: &EventRecord) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.venue.cmp(&b.venue))
        .then_with(|| a.title.cmp(&b.title))
}
