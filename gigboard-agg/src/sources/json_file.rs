//! JSON feed on disk
//!
//! Reads a JSON array of `RawEvent` objects. Used for venues exported by an
//! external scraper and for offline fixtures.

use super::{RawEvent, SourceAdapter, SourceError};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

#[async_trait]
impl SourceAdapter for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content)
            .map_err(|e| SourceError::Parse(format!("{}: {}", self.path.display(), e)))
    }
}
