//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the crate,
//! including endpoints, timeouts, retry defaults and size limits.

use std::time::Duration;

// Endpoints
/// CDX index endpoint queried by default.
pub const DEFAULT_CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";
/// Base of every constructed archive URL (`<base>/<timestamp>/<original>`).
pub const DEFAULT_ARCHIVE_BASE: &str = "https://web.archive.org/web";

/// Default User-Agent string for index and archive requests.
///
/// Users can override this via the `--user-agent` CLI flag or the
/// `user_agent` field of the client and download configuration.
pub const DEFAULT_USER_AGENT: &str = "wayback_harvest/0.1 (+https://web.archive.org)";

/// Cookie name carrying the optional CDX API token.
pub const CDX_AUTH_COOKIE: &str = "cdx-auth-token";

// Network operation timeouts
/// Per-request timeout for index queries in seconds
pub const INDEX_TIMEOUT_SECS: u64 = 30;
/// Per-attempt timeout for archive downloads in seconds
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

// Retry strategy
/// Initial delay in milliseconds before the first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u32 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of attempts (including the initial attempt)
/// Set to 5 = initial attempt + 4 retries
pub const RETRY_MAX_ATTEMPTS: u32 = 5;
/// Upper bound of the random jitter added to each delay, as a fraction of it
pub const RETRY_JITTER_FRACTION: f64 = 0.25;
/// HTTP statuses retried by default
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

// Parallel downloads
/// Number of download workers when the caller does not choose one
pub const DEFAULT_WORKERS: usize = 4;

// Pagination
/// Records requested per resume-key batch
pub const DEFAULT_RESUME_BATCH_SIZE: u32 = 10_000;
/// Maximum number of page/batch requests a single iteration may issue
/// Guards against an index that keeps returning the same continuation
pub const MAX_PAGE_ITERATIONS: usize = 100_000;

// Response and body size limits
/// Maximum archived body size in bytes (50MB)
/// Larger bodies fail the attempt instead of exhausting memory
pub const MAX_RESPONSE_BODY_SIZE: usize = 50 * 1024 * 1024;
/// Maximum characters of an index error body kept in `Error::Index`
pub const MAX_BODY_EXCERPT_CHARS: usize = 300;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Per-request index timeout as a `Duration`.
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(INDEX_TIMEOUT_SECS);
