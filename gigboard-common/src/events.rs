//! Pipeline progress events
//!
//! Provides the GigEvent enum and EventBus used to report refresh progress.
//! Consumers (the CLI progress log, tests) subscribe; the pipeline never
//! blocks on a slow or absent subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Gigboard pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GigEvent {
    /// A dataset refresh began
    RefreshStarted {
        run_id: Uuid,
        /// Number of configured source adapters
        source_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One source adapter returned its raw records
    SourceFetched {
        run_id: Uuid,
        source: String,
        record_count: usize,
    },

    /// One source adapter failed; its venue is missing from this refresh
    SourceFailed {
        run_id: Uuid,
        source: String,
        error: String,
    },

    /// Combiner finished
    Combined {
        run_id: Uuid,
        /// Records kept after normalization
        record_count: usize,
        /// Records dropped for a missing or invalid start time
        dropped_count: usize,
    },

    /// A performer name was resolved during enrichment
    PerformerResolved {
        run_id: Uuid,
        name: String,
        /// True when an external lookup was made for this name
        fetched: bool,
        found: bool,
        /// Events processed so far
        current: usize,
        /// Events in the dataset
        total: usize,
    },

    /// Refreshed dataset persisted
    RefreshCompleted {
        run_id: Uuid,
        record_count: usize,
        /// External lookups performed during the run
        lookups: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for GigEvents
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GigEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GigEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GigEvent) -> Result<usize, broadcast::error::SendError<GigEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GigEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(8);
        let result = bus.emit(GigEvent::SourceFetched {
            run_id: Uuid::new_v4(),
            source: "gilman".to_string(),
            record_count: 3,
        });
        assert!(result.is_err());
        // Lossy emit must not panic either
        bus.emit_lossy(GigEvent::SourceFailed {
            run_id: Uuid::new_v4(),
            source: "gilman".to_string(),
            error: "timeout".to_string(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit_lossy(GigEvent::RefreshStarted { run_id, source_count: 2, timestamp: Utc::now() });
        bus.emit_lossy(GigEvent::Combined { run_id, record_count: 5, dropped_count: 1 });

        assert!(matches!(rx.recv().await.unwrap(), GigEvent::RefreshStarted { source_count: 2, .. }));
        assert!(matches!(rx.recv().await.unwrap(), GigEvent::Combined { record_count: 5, dropped_count: 1, .. }));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = GigEvent::SourceFetched {
            run_id: Uuid::nil(),
            source: "tamarack".to_string(),
            record_count: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SourceFetched");
        assert_eq!(json["source"], "tamarack");
    }
}
