//! Snapshot metadata of a URL.
//!
//! This module provides:
//! - URL normalization for index lookups
//! - The metadata aggregator (count, annotated snapshots, latest, oldest)

mod aggregator;
mod url;

// Re-export public API
pub use aggregator::{
    get_wayback_metadata, BoundStrategy, MetadataOptions, Snapshot, SnapshotBound,
    WaybackMetadata, DEFAULT_METADATA_COLLAPSE,
};
pub use url::normalize_url;
