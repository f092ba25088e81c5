//! Configuration types and CLI options.
//!
//! This module defines the typed configuration of the index client and the
//! download subsystem, plus the structs used for command-line parsing.
//! Every struct enumerates its defaults once, in its `Default` impl.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cdx::{MatchType, SortType};
use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Settings for talking to the CDX index.
#[derive(Debug, Clone)]
pub struct IndexClientConfig {
    /// CDX endpoint URL
    pub endpoint: String,
    /// Base used to build archive URLs from records
    pub archive_base: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// HTTP User-Agent header value
    pub user_agent: String,
    /// Optional API token, sent as the `cdx-auth-token` cookie
    pub auth_token: Option<String>,
}

impl Default for IndexClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
            timeout: INDEX_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_token: None,
        }
    }
}

/// Retry and backoff settings for a single archived-content fetch.
///
/// Delay before retry `n` (1-based) is
/// `min(base_delay * multiplier^(n-1), max_delay)`, plus a random jitter of
/// up to `jitter * delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor applied per retry
    pub multiplier: u32,
    /// Cap applied before jitter
    pub max_delay: Duration,
    /// Jitter upper bound as a fraction of the computed delay (0.0 disables)
    pub jitter: f64,
    /// HTTP statuses that trigger another attempt
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            multiplier: RETRY_FACTOR,
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            jitter: RETRY_JITTER_FRACTION,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

/// What a parallel download does when one URL exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure in that URL's outcome and keep going (default)
    #[default]
    Isolate,
    /// Stop starting new attempts and new URLs after the first terminal failure.
    ///
    /// In-flight attempts run to completion or to their own timeout; URLs
    /// that never started report `DownloadFailure::Cancelled`.
    FailFast,
}

/// Options shared by every fetch of a parallel download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Extra request headers, sent on every attempt.
    ///
    /// Leave `Accept-Encoding` out: the client negotiates compression and
    /// decodes bodies itself only when the header is not set by hand.
    pub headers: Vec<(String, String)>,
    /// HTTP User-Agent header value
    pub user_agent: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Follow HTTP redirects (up to 10 hops)
    pub follow_redirects: bool,
    /// Read the body chunk by chunk instead of in one buffered read
    pub stream: bool,
    /// Bodies larger than this fail the attempt
    pub max_body_size: usize,
    /// Retry and backoff settings
    pub retry: RetryPolicy,
    /// Number of concurrent workers
    pub workers: usize,
    /// Behaviour after a terminal failure
    pub failure_policy: FailurePolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            follow_redirects: true,
            stream: false,
            max_body_size: MAX_RESPONSE_BODY_SIZE,
            retry: RetryPolicy::default(),
            workers: DEFAULT_WORKERS,
            failure_policy: FailurePolicy::Isolate,
        }
    }
}

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "wayback_harvest",
    version,
    about = "Query the Wayback Machine CDX index and download archived captures"
)]
pub struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// CDX endpoint URL
    #[arg(long, default_value = DEFAULT_CDX_ENDPOINT, global = true)]
    pub endpoint: String,

    /// CDX API token (sent as a cookie)
    #[arg(long, global = true)]
    pub auth_token: Option<String>,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT, global = true)]
    pub user_agent: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarise the snapshots of a URL (count, oldest, latest)
    Metadata(MetadataArgs),
    /// Run a raw index query and print the records
    Search(SearchArgs),
    /// Download a list of archive URLs in parallel
    Download(DownloadArgs),
}

/// Arguments of `metadata`.
#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// URL to look up (https:// is added when missing)
    pub url: String,
    /// Start date, yyyy[MM[dd[hh[mm[ss]]]]]
    #[arg(long)]
    pub from: Option<String>,
    /// End date, yyyy[MM[dd[hh[mm[ss]]]]]
    #[arg(long)]
    pub to: Option<String>,
    /// Collapse key (e.g. timestamp:4 for one snapshot per year)
    #[arg(long, default_value = "timestamp:4")]
    pub collapse: String,
    /// Resolve latest/oldest with dedicated limit-1 queries
    #[arg(long)]
    pub dedicated_bounds: bool,
}

/// Arguments of `search`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// URL to query
    pub url: String,
    /// URL matching mode
    #[arg(long, value_enum)]
    pub match_type: Option<MatchType>,
    /// Start date, yyyy[MM[dd[hh[mm[ss]]]]]
    #[arg(long)]
    pub from: Option<String>,
    /// End date, yyyy[MM[dd[hh[mm[ss]]]]]
    #[arg(long)]
    pub to: Option<String>,
    /// Maximum number of records
    #[arg(long)]
    pub limit: Option<i64>,
    /// Regex filter, [!][~]field:pattern (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,
    /// Collapse key, field or field:N (repeatable)
    #[arg(long = "collapse")]
    pub collapse: Vec<String>,
    /// Sort order
    #[arg(long, value_enum)]
    pub sort: Option<SortType>,
    /// Timestamp for closest sorting
    #[arg(long)]
    pub closest: Option<String>,
    /// Comma-separated output fields
    #[arg(long)]
    pub fields: Option<String>,
    /// Follow resume keys until the index is exhausted
    #[arg(long)]
    pub all: bool,
    /// Records per resume-key batch (with --all)
    #[arg(long, default_value_t = DEFAULT_RESUME_BATCH_SIZE)]
    pub batch_size: u32,
}

/// Arguments of `download`.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// File with one archive URL per line ("-" for stdin)
    pub file: PathBuf,
    /// Number of parallel workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub jobs: usize,
    /// Proxy list, one host:port[:username:password] per line
    #[arg(long)]
    pub proxies: Option<PathBuf>,
    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = DOWNLOAD_TIMEOUT_SECS)]
    pub timeout_seconds: u64,
    /// Attempts per URL, including the first
    #[arg(long, default_value_t = RETRY_MAX_ATTEMPTS)]
    pub attempts: u32,
    /// Stop after the first URL that exhausts its retries
    #[arg(long)]
    pub fail_fast: bool,
    /// Read bodies chunk by chunk
    #[arg(long)]
    pub stream: bool,
    /// Rewrite archive URLs to the raw `id_` form before fetching
    #[arg(long)]
    pub raw: bool,
    /// Directory to write bodies into (one file per input line)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}
