//! Integration tests for the cache manager
//!
//! Drives full refreshes through fake sources and a fake metadata lookup,
//! with the data folder in a temporary directory.

mod helpers;

use chrono::Duration;
use gigboard_agg::services::cache_manager::{DATASET_FILE, LOOKUP_FILE, TIMESTAMP_FILE};
use gigboard_agg::services::CacheManager;
use gigboard_agg::sources::SourceAdapter;
use gigboard_common::events::EventBus;
use gigboard_common::{persist, time};
use helpers::{raw_event, FakeLookup, FakeSource};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn gilman() -> Arc<FakeSource> {
    Arc::new(FakeSource::ok(
        "gilman",
        vec![
            raw_event("924 Gilman", "2025-06-02T19:00:00-07:00", "Alpha", &["Beta"]),
            raw_event("924 Gilman", "2025-06-01T19:00:00-07:00", "Gamma", &[]),
        ],
    ))
}

fn manager_with(dir: &Path, source: Arc<FakeSource>, lookup: Arc<FakeLookup>) -> CacheManager {
    let sources: Vec<Arc<dyn SourceAdapter>> = vec![source];
    CacheManager::new(dir, time::hours(24), sources, lookup, EventBus::new(256))
}

fn write_timestamp(dir: &Path, age: Duration) {
    let produced_at = time::now() - age;
    persist::write_atomic(&dir.join(TIMESTAMP_FILE), time::format_timestamp(produced_at).as_bytes()).unwrap();
}

#[tokio::test]
async fn test_empty_folder_is_stale_and_refreshes() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new()));

    assert!(manager.is_stale());
    assert!(manager.last_updated().is_none());

    let records = manager.read(false).await.unwrap();

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].headliner, "Gamma");
    assert!(dir.path().join(DATASET_FILE).exists());
    assert!(!manager.is_stale());
}

#[tokio::test]
async fn test_fresh_cache_served_without_refresh() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new()));

    let first = manager.read(false).await.unwrap();
    let second = manager.read(false).await.unwrap();

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_thirty_hour_old_cache_refreshes_once() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let lookup = Arc::new(FakeLookup::new().with_artist("Alpha", "https://alpha.bandcamp.com"));
    let manager = manager_with(dir.path(), source.clone(), lookup);

    manager.refresh().await.unwrap();
    assert_eq!(source.fetch_count(), 1);

    write_timestamp(dir.path(), Duration::hours(30));
    assert!(manager.is_stale());

    let records = manager.read(false).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
    assert!(!manager.is_stale());

    manager.read(false).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
    assert!(records[1].notes.starts_with("Alpha: https://alpha.bandcamp.com"));
}

#[tokio::test]
async fn test_staleness_boundary() {
    let dir = TempDir::new().unwrap();
    let manager = manager_with(dir.path(), gilman(), Arc::new(FakeLookup::new()));
    manager.refresh().await.unwrap();

    let produced_at = manager.last_updated().unwrap();
    assert!(!manager.is_stale_at(produced_at + Duration::hours(24)));
    assert!(manager.is_stale_at(produced_at + Duration::hours(24) + Duration::seconds(1)));
}

#[tokio::test]
async fn test_corrupt_timestamp_counts_as_stale() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new()));
    manager.refresh().await.unwrap();

    std::fs::write(dir.path().join(TIMESTAMP_FILE), "yesterday-ish").unwrap();
    assert!(manager.last_updated().is_none());
    assert!(manager.is_stale());

    manager.read(false).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_missing_dataset_with_fresh_timestamp_is_stale() {
    let dir = TempDir::new().unwrap();
    let manager = manager_with(dir.path(), gilman(), Arc::new(FakeLookup::new()));
    write_timestamp(dir.path(), Duration::minutes(5));

    assert!(manager.is_stale());
}

#[tokio::test]
async fn test_corrupt_dataset_triggers_refresh() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new()));
    manager.refresh().await.unwrap();

    std::fs::write(dir.path().join(DATASET_FILE), "{\"venue\": \"half a row\n").unwrap();
    assert!(manager.load_dataset().is_err());

    let records = manager.read(false).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_force_read_refreshes_fresh_cache() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new()));

    manager.read(false).await.unwrap();
    manager.read(true).await.unwrap();

    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_dataset_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let lookup = Arc::new(FakeLookup::new().with_artist("Gamma", "https://gamma.bandcamp.com"));
    let manager = manager_with(dir.path(), gilman(), lookup);

    let refreshed = manager.refresh().await.unwrap();

    // A second manager over the same folder sees the same state
    let reopened = manager_with(dir.path(), gilman(), Arc::new(FakeLookup::new()));
    assert_eq!(reopened.load_dataset().unwrap(), refreshed);
    assert_eq!(reopened.last_updated(), manager.last_updated());
}

#[tokio::test]
async fn test_lookups_persist_across_refreshes() {
    let dir = TempDir::new().unwrap();
    let lookup = Arc::new(FakeLookup::new());
    let manager = manager_with(dir.path(), gilman(), lookup.clone());

    manager.refresh().await.unwrap();
    manager.refresh().await.unwrap();

    assert_eq!(lookup.calls_for("Alpha"), 1);
    assert_eq!(lookup.calls_for("Beta"), 1);
    assert_eq!(lookup.calls_for("Gamma"), 1);
}

#[tokio::test]
async fn test_concurrent_stale_reads_share_one_refresh() {
    let dir = TempDir::new().unwrap();
    let source = gilman();
    let manager = Arc::new(manager_with(dir.path(), source.clone(), Arc::new(FakeLookup::new())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.read(false).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_unwritable_data_folder_reports_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-folder");
    std::fs::write(&blocker, "file").unwrap();

    let manager = manager_with(&blocker, gilman(), Arc::new(FakeLookup::new()));
    assert!(manager.refresh().await.is_err());
}

#[tokio::test]
async fn test_corrupt_lookup_store_does_not_block_refresh() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join(LOOKUP_FILE);
    let mut bytes = b"{\"name\":\"Alpha\",\"url\":\"https://alpha.bandcamp.com\",\"tags\":\"punk\"}\n".to_vec();
    bytes.extend_from_slice(b"\xff\xfe garbage\n");
    bytes.extend_from_slice(b"not json at all\n");
    std::fs::write(&store_path, bytes).unwrap();

    let source = gilman();
    let lookup = Arc::new(FakeLookup::new());
    let manager = manager_with(dir.path(), source.clone(), lookup.clone());

    let records = manager.read(false).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(lookup.calls_for("Alpha"), 0);
    assert!(records[1].notes.starts_with("Alpha: https://alpha.bandcamp.com"));

    // Rewritten without the unusable rows
    let rewritten = std::fs::read_to_string(&store_path).unwrap();
    assert_eq!(rewritten.lines().count(), 3);

    manager.read(true).await.unwrap();
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_two_managers_refreshing_one_folder() {
    let dir = TempDir::new().unwrap();
    let first = manager_with(dir.path(), gilman(), Arc::new(FakeLookup::new()));
    let second = manager_with(dir.path(), gilman(), Arc::new(FakeLookup::new()));

    let (a, b) = tokio::join!(first.refresh(), second.refresh());

    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(first.load_dataset().unwrap().len(), 2);
    assert!(!first.is_stale());
}
