//! Performer metadata lookup
//!
//! `MetadataLookup` is the seam the enrichment engine calls on a lookup-store
//! miss. `MusicBrainzLookup` implements it against the MusicBrainz web
//! service: an artist search picks the best match, then an artist lookup
//! fetches its URL relations, genres, tags and area.

use async_trait::async_trait;
use gigboard_common::config::LookupConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const MUSICBRAINZ_ARTIST_PAGE: &str = "https://musicbrainz.org/artist";
const SEARCH_LIMIT: &str = "5";
const MAX_TAGS: usize = 8;

/// Metadata lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Metadata found for one performer
///
/// `url == None` means the service had no page for the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformerMetadata {
    pub url: Option<String>,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
}

impl PerformerMetadata {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// External performer metadata service
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &'static str;

    /// Look up one performer by display name
    async fn lookup(&self, performer: &str) -> Result<PerformerMetadata, LookupError>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBArtistSearch {
    #[serde(default)]
    pub artists: Vec<MBSearchArtist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBSearchArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBArtist {
    pub id: String,
    #[serde(default)]
    pub area: Option<MBArea>,
    #[serde(rename = "begin-area", default)]
    pub begin_area: Option<MBArea>,
    #[serde(default)]
    pub genres: Vec<MBTag>,
    #[serde(default)]
    pub tags: Vec<MBTag>,
    #[serde(default)]
    pub relations: Vec<MBRelation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBArea {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBTag {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBRelation {
    #[serde(rename = "type", default)]
    pub relation_type: String,
    #[serde(default)]
    pub url: Option<MBUrl>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MBUrl {
    pub resource: String,
}

/// MusicBrainz-backed performer lookup
pub struct MusicBrainzLookup {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    min_score: u8,
}

impl MusicBrainzLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        // MusicBrainz rate limit: 1 request/second
        let quota = Quota::per_second(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::direct(quota),
            min_score: config.min_score,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 503 {
            return Err(LookupError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| LookupError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl MetadataLookup for MusicBrainzLookup {
    fn name(&self) -> &'static str {
        "MusicBrainz"
    }

    async fn lookup(&self, performer: &str) -> Result<PerformerMetadata, LookupError> {
        let query = format!("artist:\"{}\"", escape_query(performer));
        let search: MBArtistSearch = self
            .get_json(
                &format!("{}/artist", MUSICBRAINZ_BASE_URL),
                &[("query", query.as_str()), ("limit", SEARCH_LIMIT), ("fmt", "json")],
            )
            .await?;

        let Some(best) = pick_best_match(performer, &search.artists, self.min_score) else {
            tracing::info!(performer = %performer, candidates = search.artists.len(), "No MusicBrainz match");
            return Ok(PerformerMetadata::not_found());
        };

        let artist: MBArtist = self
            .get_json(
                &format!("{}/artist/{}", MUSICBRAINZ_BASE_URL, best.id),
                &[("inc", "url-rels+genres+tags"), ("fmt", "json")],
            )
            .await?;

        let metadata = to_metadata(&artist);
        tracing::info!(
            performer = %performer,
            matched = %best.name,
            score = best.score,
            url = %metadata.url.as_deref().unwrap_or_default(),
            "Retrieved performer from MusicBrainz"
        );
        Ok(metadata)
    }
}

/// Pick the search result to trust for `performer`
///
/// Results under `min_score` are ignored. An exact (case-insensitive) name
/// match wins over a higher-scored fuzzy one.
pub(crate) fn pick_best_match<'a>(
    performer: &str,
    candidates: &'a [MBSearchArtist],
    min_score: u8,
) -> Option<&'a MBSearchArtist> {
    let mut eligible = candidates.iter().filter(|c| c.score >= min_score);
    let first = eligible.clone().next()?;
    Some(
        eligible
            .find(|c| c.name.trim().eq_ignore_ascii_case(performer.trim()))
            .unwrap_or(first),
    )
}

/// Build performer metadata from a full artist record
pub(crate) fn to_metadata(artist: &MBArtist) -> PerformerMetadata {
    let bandcamp = artist
        .relations
        .iter()
        .filter_map(|r| r.url.as_ref().map(|u| (r.relation_type.as_str(), u.resource.as_str())))
        .find(|(kind, resource)| *kind == "bandcamp" || resource.contains("bandcamp.com"))
        .map(|(_, resource)| resource);
    let url = bandcamp
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/{}", MUSICBRAINZ_ARTIST_PAGE, artist.id));

    let genre = by_count(&artist.genres).into_iter().next();

    let mut tags: Vec<String> = Vec::new();
    for tag in by_count(&artist.tags) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    let location = match (&artist.begin_area, &artist.area) {
        (Some(begin), Some(area)) if begin.name != area.name => {
            Some(format!("{}, {}", begin.name, area.name))
        }
        (Some(begin), _) => Some(begin.name.clone()),
        (None, Some(area)) => Some(area.name.clone()),
        (None, None) => None,
    };

    PerformerMetadata { url: Some(url), genre, tags, location }
}

fn by_count(tags: &[MBTag]) -> Vec<String> {
    let mut sorted: Vec<&MBTag> = tags.iter().filter(|t| !t.name.trim().is_empty()).collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.into_iter().map(|t| t.name.trim().to_string()).collect()
}

/// Escape Lucene query syntax characters
fn escape_query(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(
            c,
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*'
                | '?' | ':' | '\\' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
