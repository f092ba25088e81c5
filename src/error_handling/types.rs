//! Error type definitions.
//!
//! This module defines the error taxonomy of the crate plus the failure
//! categories counted during parallel downloads.

use std::fmt;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors surfaced by index queries, query construction and downloads.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid query or option combination, caught before any request is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network-level failure (timeout, connection reset, DNS).
    #[error("Transport error: {0}")]
    Transport(#[from] ReqwestError),

    /// The index answered with a non-success status.
    #[error("Index returned HTTP {status_code}: {body_excerpt}")]
    Index {
        /// HTTP status returned by the index
        status_code: u16,
        /// Leading part of the response body
        body_excerpt: String,
    },

    /// A content fetch exhausted its retry budget.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The index response could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Initialization of a shared resource failed.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

/// A malformed index row, or a whole response that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed index row {line}: {reason}")]
pub struct ParseError {
    /// 1-based line (text) or row (JSON) number; 0 for the whole body
    pub line: usize,
    /// What was wrong with it
    pub reason: String,
}

/// Terminal failure of one archived-content fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Download of {url} failed after {attempts} attempt(s): {cause}")]
pub struct DownloadError {
    /// URL that was being fetched
    pub url: String,
    /// Last status or cause observed
    pub cause: DownloadFailure,
    /// Attempts actually made (0 if cancelled before the first one)
    pub attempts: u32,
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    /// Server answered with a non-success status
    Status(u16),
    /// Network-level failure, including a body interrupted mid-stream
    Transport {
        /// Failure category
        kind: ErrorType,
        /// Underlying error message
        message: String,
    },
    /// The URL could not be parsed or requested
    InvalidUrl(String),
    /// Body exceeded the configured limit
    BodyTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },
    /// Fail-fast cancellation stopped this URL
    Cancelled,
    /// The worker handling this URL terminated before reporting an outcome
    WorkerLost,
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadFailure::Status(code) => write!(f, "HTTP {code}"),
            DownloadFailure::Transport { kind, message } => write!(f, "{kind}: {message}"),
            DownloadFailure::InvalidUrl(message) => write!(f, "invalid URL: {message}"),
            DownloadFailure::BodyTooLarge { limit } => {
                write!(f, "body larger than {limit} bytes")
            }
            DownloadFailure::Cancelled => f.write_str("cancelled"),
            DownloadFailure::WorkerLost => f.write_str("download worker terminated"),
        }
    }
}

/// Categories of download failures, counted per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // HTTP/Network errors
    HttpRequestBuilderError,
    HttpRequestRedirectError,
    HttpRequestTimeoutError,
    HttpRequestRequestError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestDecodeError,
    HttpRequestOtherError,
    HttpRequestTooManyRequests,
    // Specific HTTP status code errors
    HttpRequestBadRequest,          // 400
    HttpRequestUnauthorized,        // 401
    HttpRequestForbidden,           // 403
    HttpRequestNotFound,            // 404
    HttpRequestInternalServerError, // 500
    HttpRequestBadGateway,          // 502
    HttpRequestServiceUnavailable,  // 503
    HttpRequestGatewayTimeout,      // 504
    // Local limits and policy
    BodyTooLarge,
    InvalidUrl,
    Cancelled,
    WorkerLost,
}

/// Notable download events that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// An attempt was retried
    RetryAttempt,
    /// A URL was fetched through a proxy
    ProxyAssigned,
    /// A body broke off mid-stream and was discarded
    StreamInterrupted,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestRequestError => "HTTP request error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestDecodeError => "HTTP request decode error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
            ErrorType::HttpRequestTooManyRequests => "Too many requests",
            ErrorType::HttpRequestBadRequest => "Bad Request (400)",
            ErrorType::HttpRequestUnauthorized => "Unauthorized (401)",
            ErrorType::HttpRequestForbidden => "Forbidden (403)",
            ErrorType::HttpRequestNotFound => "Not Found (404)",
            ErrorType::HttpRequestInternalServerError => "Internal Server Error (500)",
            ErrorType::HttpRequestBadGateway => "Bad Gateway (502)",
            ErrorType::HttpRequestServiceUnavailable => "Service Unavailable (503)",
            ErrorType::HttpRequestGatewayTimeout => "Gateway Timeout (504)",
            ErrorType::BodyTooLarge => "Body too large",
            ErrorType::InvalidUrl => "Invalid URL",
            ErrorType::Cancelled => "Cancelled",
            ErrorType::WorkerLost => "Worker lost",
        }
    }
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::RetryAttempt => "Retried attempt",
            InfoType::ProxyAssigned => "Fetched through proxy",
            InfoType::StreamInterrupted => "Body interrupted mid-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_error_types_have_string_representation() {
        for error_type in ErrorType::iter() {
            assert!(
                !error_type.as_str().is_empty(),
                "{:?} should have non-empty string",
                error_type
            );
        }
    }

    #[test]
    fn test_all_info_types_have_string_representation() {
        for info_type in InfoType::iter() {
            assert!(!info_type.as_str().is_empty());
        }
    }

    #[test]
    fn test_download_error_message_carries_attempts_and_cause() {
        let err = DownloadError {
            url: "https://web.archive.org/web/20200101000000/https://example.com/".into(),
            cause: DownloadFailure::Status(503),
            attempts: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("5 attempt(s)"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_index_error_display() {
        let err = Error::Index {
            status_code: 403,
            body_excerpt: "Blocked Site Error".into(),
        };
        assert_eq!(err.to_string(), "Index returned HTTP 403: Blocked Site Error");
    }

    #[test]
    fn test_parse_error_converts_into_error() {
        let err: Error = ParseError {
            line: 3,
            reason: "expected 7 fields, found 2".into(),
        }
        .into();
        assert!(matches!(err, Error::Parse(ParseError { line: 3, .. })));
    }
}
