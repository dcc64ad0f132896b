//! Google Calendar venue feed
//!
//! Some venues publish shows on a public Google Calendar. Only items whose
//! summary mentions "show" are listings; the rest are private bookings and
//! closures. Summaries look like `Show - Alpha, Beta, Gamma`.

use super::{split_performers, RawEvent, SourceAdapter, SourceError};
use async_trait::async_trait;
use chrono::{Days, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3/calendars";
const MAX_RESULTS: &str = "250";

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarResponse {
    #[serde(default)]
    pub items: Vec<CalendarItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarItem {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: Option<CalendarTime>,
    #[serde(default)]
    pub end: Option<CalendarTime>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarTime {
    /// Set for timed events; all-day events only carry `date`
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<String>,
}

pub struct CalendarSource {
    name: String,
    venue: String,
    calendar_id: String,
    api_key: String,
    image_url: Option<String>,
    horizon_days: u32,
    http_client: reqwest::Client,
}

impl CalendarSource {
    pub fn new(
        name: impl Into<String>,
        venue: impl Into<String>,
        calendar_id: impl Into<String>,
        api_key: impl Into<String>,
        image_url: Option<String>,
        horizon_days: u32,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            venue: venue.into(),
            calendar_id: calendar_id.into(),
            api_key: api_key.into(),
            image_url,
            horizon_days,
            http_client,
        }
    }
}

#[async_trait]
impl SourceAdapter for CalendarSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
        let today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .ok_or_else(|| SourceError::Parse("invalid midnight".to_string()))?;
        let horizon = today
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .unwrap_or(today);

        let url = format!("{}/{}/events", CALENDAR_BASE_URL, self.calendar_id);
        debug!(source = %self.name, url = %url, "Querying calendar feed");

        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .query(&[
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", MAX_RESULTS),
                ("timeMin", today.to_rfc3339().as_str()),
                ("timeMax", horizon.to_rfc3339().as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http(status.as_u16(), url));
        }

        let body: CalendarResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(parse_items(&self.venue, self.image_url.as_deref(), body.items))
    }
}

/// Convert calendar items to raw events, keeping only show listings
pub(crate) fn parse_items(venue: &str, image_url: Option<&str>, items: Vec<CalendarItem>) -> Vec<RawEvent> {
    items
        .into_iter()
        .filter_map(|item| {
            let summary = item.summary?;
            if !summary.to_lowercase().contains("show") {
                return None;
            }
            let title = strip_show_prefix(&summary).to_string();
            let (headliner, supporting) = split_performers(&title, ",");
            Some(RawEvent {
                venue: Some(venue.to_string()),
                start: item.start.and_then(|t| t.date_time),
                end: item.end.and_then(|t| t.date_time),
                headliner: Some(headliner),
                supporting,
                image_url: image_url.map(str::to_string),
                event_url: item.html_link,
                title: Some(title),
                notes: None,
            })
        })
        .collect()
}

/// Strip a leading `Show -` (any dash, any case) from a summary
fn strip_show_prefix(summary: &str) -> &str {
    let trimmed = summary.trim();
    let Some(head) = trimmed.get(..4) else {
        return trimmed;
    };
    if !head.eq_ignore_ascii_case("show") {
        return trimmed;
    }
    let rest = trimmed[4..].trim_start();
    match rest.chars().next() {
        Some(dash @ ('-' | '–' | '—')) => rest[dash.len_utf8()..].trim(),
        _ => trimmed,
    }
}
