//! Initialization of shared resources.
//!
//! This module provides functions to initialize:
//! - The logger (plain or JSON, written to stderr)
//! - HTTP clients for index queries and downloads (with optional proxies)
//!
//! All initialization functions return `InitializationError` on failure.

mod client;
mod logger;

// Re-export public API
pub use client::{init_download_client, init_index_client};
pub use logger::init_logger_with;
