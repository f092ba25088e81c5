//! wayback_harvest library: Wayback Machine CDX retrieval and parallel downloads
//!
//! This library provides:
//! - A fluent, eagerly validated query builder for the CDX index
//! - An index client with latest/oldest/closest helpers and a page-count probe
//! - Page-indexed and resume-key iteration over large result sets
//! - A snapshot metadata aggregator (count, annotated list, latest, oldest)
//! - A parallel downloader with bounded retries, jittered backoff, ordered
//!   results and round-robin proxy rotation
//!
//! # Example
//!
//! ```no_run
//! use wayback_harvest::cdx::{IndexClient, MatchType};
//! use wayback_harvest::config::IndexClientConfig;
//! use wayback_harvest::metadata::{get_wayback_metadata, MetadataOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> wayback_harvest::Result<()> {
//! let client = IndexClient::new(IndexClientConfig::default())?;
//!
//! let spec = client
//!     .query("example.com")
//!     .match_type(MatchType::Prefix)
//!     .from_date("2020")
//!     .filter("statuscode:200")
//!     .limit(50)
//!     .build()?;
//! for record in client.search(&spec).await? {
//!     println!("{} {}", record.timestamp, record.original);
//! }
//!
//! let summary = get_wayback_metadata(&client, "example.com", &MetadataOptions::default()).await?;
//! println!("{} yearly snapshots", summary.snapshots_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod cdx;
pub mod config;
pub mod download;
pub mod error_handling;
pub mod initialization;
pub mod metadata;

// Re-export public API
pub use cdx::{CaptureRecord, IndexClient, QueryBuilder, QuerySpec};
pub use config::{DownloadOptions, FailurePolicy, IndexClientConfig, RetryPolicy};
pub use download::{parallel_download, DownloadOutcome, ProxyPool};
pub use error_handling::{DownloadError, Error, Result};
pub use metadata::{get_wayback_metadata, MetadataOptions, WaybackMetadata};
