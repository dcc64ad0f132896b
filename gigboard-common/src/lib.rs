//! # Gigboard Common Library
//!
//! Shared code for the Gigboard crates including:
//! - Event and performer lookup records
//! - Pipeline progress events (GigEvent enum) and the EventBus
//! - Configuration loading and data folder resolution
//! - Atomic file persistence helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod persist;
pub mod time;

pub use error::{Error, Result};
pub use models::{EventRecord, LookupEntry};
