//! Error handling and processing statistics.
//!
//! This module provides:
//! - The crate error taxonomy (configuration, transport, index, download, parse)
//! - Failure categorization and transport retriability
//! - Per-run statistics of download failures and events

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_failure, categorize_reqwest_error, categorize_status, is_retriable_transport,
    update_error_stats,
};
pub use stats::ProcessingStats;
pub use types::{
    DownloadError, DownloadFailure, Error, ErrorType, InfoType, InitializationError, ParseError,
    Result,
};
