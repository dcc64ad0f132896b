//! Aggregation and enrichment pipeline services

pub mod cache_manager;
pub mod combiner;
pub mod enrichment;
pub mod lookup_store;
pub mod metadata_client;
pub mod normalizer;

pub use cache_manager::{CacheManager, CachePaths};
pub use combiner::{combine, Combined};
pub use enrichment::{EnrichmentEngine, EnrichmentReport};
pub use lookup_store::{LookupStore, Resolution};
pub use metadata_client::{LookupError, MetadataLookup, MusicBrainzLookup, PerformerMetadata};
pub use normalizer::{normalize, NormalizeError};
