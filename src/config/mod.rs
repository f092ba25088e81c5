//! Crate configuration and constants.
//!
//! This module provides:
//! - Configuration constants (endpoints, timeouts, retry defaults, limits)
//! - Typed configuration structs with documented defaults
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    Cli, Command, DownloadArgs, DownloadOptions, FailurePolicy, IndexClientConfig, LogFormat,
    LogLevel, MetadataArgs, RetryPolicy, SearchArgs,
};
