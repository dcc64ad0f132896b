//! Wix site feed
//!
//! Wix pages embed their event list in a `<script id="wix-warmup-data">` JSON
//! blob. The list sits at an unpredictable depth, so we search for the first
//! `events` array whose items all carry a `title`.

use super::{split_performers, RawEvent, SourceAdapter, SourceError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const WARMUP_MARKER: &str = "id=\"wix-warmup-data\"";
const RESIDENCY_PREFIX: &str = "BLUE MONDAYS - ";
const PERFORMER_SEPARATOR: &str = " / ";

pub struct WixWarmupSource {
    name: String,
    venue: String,
    url: String,
    http_client: reqwest::Client,
}

impl WixWarmupSource {
    pub fn new(
        name: impl Into<String>,
        venue: impl Into<String>,
        url: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            venue: venue.into(),
            url: url.into(),
            http_client,
        }
    }
}

#[async_trait]
impl SourceAdapter for WixWarmupSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
        debug!(source = %self.name, url = %self.url, "Fetching Wix page");

        let response = self
            .http_client
            .get(&self.url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http(status.as_u16(), self.url.clone()));
        }

        let html = response.text().await?;
        parse_page(&self.venue, &self.url, &html)
    }
}

/// Extract and convert the event list from a Wix page
pub(crate) fn parse_page(venue: &str, site_url: &str, html: &str) -> Result<Vec<RawEvent>, SourceError> {
    let blob = extract_warmup_json(html)
        .ok_or_else(|| SourceError::Parse("warm-up data script not found".to_string()))?;
    let warmup: Value = serde_json::from_str(blob)
        .map_err(|e| SourceError::Parse(format!("warm-up data: {}", e)))?;
    let events = find_events_node(&warmup)
        .ok_or_else(|| SourceError::Parse("warm-up data has no events list".to_string()))?;

    let site = site_url.trim_end_matches('/');
    Ok(events.iter().map(|event| to_raw_event(venue, site, event)).collect())
}

fn extract_warmup_json(html: &str) -> Option<&str> {
    let marker = html.find(WARMUP_MARKER)?;
    let body_start = marker + html[marker..].find('>')? + 1;
    let body_len = html[body_start..].find("</script>")?;
    Some(html[body_start..body_start + body_len].trim())
}

fn find_events_node(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("events") {
                if !items.is_empty() && items.iter().all(|i| i.get("title").is_some()) {
                    return Some(items);
                }
            }
            map.values().find_map(find_events_node)
        }
        Value::Array(items) => items.iter().find_map(find_events_node),
        _ => None,
    }
}

fn to_raw_event(venue: &str, site: &str, event: &Value) -> RawEvent {
    let raw_title = event.get("title").and_then(Value::as_str).unwrap_or_default();
    let title = strip_residency_prefix(raw_title).to_string();
    let (headliner, supporting) = split_performers(&title, PERFORMER_SEPARATOR);

    let config = event.pointer("/scheduling/config");
    let time_field = |key: &str| {
        config
            .and_then(|c| c.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    RawEvent {
        venue: Some(venue.to_string()),
        start: time_field("startDate"),
        end: time_field("endDate"),
        headliner: Some(headliner),
        supporting,
        image_url: event
            .pointer("/mainImage/url")
            .and_then(Value::as_str)
            .map(str::to_string),
        event_url: event
            .get("slug")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|slug| format!("{}/event-details/{}", site, slug)),
        title: Some(title),
        notes: None,
    }
}

/// Weekly residency listings carry a series prefix before the performers
fn strip_residency_prefix(title: &str) -> &str {
    match title.to_ascii_uppercase().find(RESIDENCY_PREFIX) {
        Some(at) => title[at + RESIDENCY_PREFIX.len()..].trim(),
        None => title.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
<script type="application/json" id="wix-warmup-data">
{"appsWarmupData": {"140603ad": {"widget1": {"events": [
  {"title": "Alpha / Beta / Gamma", "slug": "alpha-2025-06-01",
   "scheduling": {"config": {"startDate": "2025-06-02T03:00:00Z", "endDate": "2025-06-02T07:00:00Z"}},
   "mainImage": {"url": "https://static.wixstatic.com/alpha.jpg"}},
  {"title": "Blue Mondays - Delta / Epsilon", "slug": "",
   "scheduling": {"config": {"startDate": "not a date"}}}
]}}}}
</script></head><body></body></html>"#;

    #[test]
    fn test_parse_page_extracts_events() {
        let events = parse_page("Eli's Mile High Club", "https://www.elismilehighclub.com/", PAGE).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.headliner.as_deref(), Some("Alpha"));
        assert_eq!(first.supporting, vec!["Beta", "Gamma"]);
        assert_eq!(first.start.as_deref(), Some("2025-06-02T03:00:00Z"));
        assert_eq!(
            first.event_url.as_deref(),
            Some("https://www.elismilehighclub.com/event-details/alpha-2025-06-01")
        );
        assert_eq!(first.image_url.as_deref(), Some("https://static.wixstatic.com/alpha.jpg"));

        let second = &events[1];
        assert_eq!(second.title.as_deref(), Some("Delta / Epsilon"));
        assert_eq!(second.headliner.as_deref(), Some("Delta"));
        assert!(second.event_url.is_none());
        assert!(second.end.is_none());
    }

    #[test]
    fn test_page_without_blob_is_parse_error() {
        let result = parse_page("Eli's", "https://example.com", "<html></html>");
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_events_list_needs_titles() {
        let value: Value = serde_json::from_str(
            r#"{"a": {"events": [{"id": 1}]}, "b": [{"events": [{"title": "Alpha"}]}]}"#,
        )
        .unwrap();
        let found = find_events_node(&value).unwrap();
        assert_eq!(found[0]["title"], "Alpha");
    }
}
