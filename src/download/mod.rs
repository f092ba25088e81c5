//! Archived-content downloads.
//!
//! This module provides:
//! - Archive URL construction (`id_` raw mode and friends)
//! - Proxy list parsing and a race-free round-robin pool
//! - Exponential backoff with jitter behind an injectable `Sleeper`
//! - The single-URL retry executor and the parallel coordinator

mod archive_url;
mod backoff;
mod coordinator;
mod executor;
mod proxy;

// Re-export public API
pub use archive_url::{build_archive_url, convert_to_id_url, ArchiveMode};
pub use backoff::{Sleeper, TokioSleeper};
pub use coordinator::{parallel_download, DownloadOutcome, ParallelDownloader};
pub use executor::{FetchedResponse, RetryExecutor};
pub use proxy::{ProxyEntry, ProxyPool};
