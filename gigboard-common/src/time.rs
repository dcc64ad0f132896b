//! Timestamp utilities

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert hours to a chrono duration
pub fn hours(hours: u64) -> Duration {
    Duration::hours(hours.min(i64::MAX as u64 / 3_600_000) as i64)
}

/// Format an instant as the persisted ISO-8601 timestamp string
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a persisted timestamp
///
/// Accepts RFC 3339 with any offset, plus offset-less ISO-8601 values which
/// are read as UTC. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Whether `produced_at` is older than `threshold` at `now`
///
/// Exactly `threshold` old is still fresh.
pub fn is_older_than(produced_at: DateTime<Utc>, threshold: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(produced_at) > threshold
}

/// Parse an RFC 3339 instant keeping its offset
pub fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}
