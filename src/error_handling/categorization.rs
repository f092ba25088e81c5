//! Error categorization and retriability.
//!
//! This module maps transport errors and HTTP statuses onto `ErrorType`
//! categories and decides which transport failures deserve another attempt.

use super::stats::ProcessingStats;
use super::types::{DownloadFailure, ErrorType};

/// Categorizes a `reqwest::Error` into an `ErrorType`.
///
/// Status codes take precedence over the error kind, so a status error for a
/// 503 is reported as `HttpRequestServiceUnavailable`, not as a generic
/// status error.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status.as_u16());
    }

    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_redirect() {
        ErrorType::HttpRequestRedirectError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_request() {
        ErrorType::HttpRequestRequestError
    } else if error.is_body() {
        ErrorType::HttpRequestBodyError
    } else if error.is_decode() {
        ErrorType::HttpRequestDecodeError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

/// Categorizes an HTTP status code into an `ErrorType`.
pub fn categorize_status(status: u16) -> ErrorType {
    match status {
        400 => ErrorType::HttpRequestBadRequest,
        401 => ErrorType::HttpRequestUnauthorized,
        403 => ErrorType::HttpRequestForbidden,
        404 => ErrorType::HttpRequestNotFound,
        429 => ErrorType::HttpRequestTooManyRequests,
        500 => ErrorType::HttpRequestInternalServerError,
        502 => ErrorType::HttpRequestBadGateway,
        503 => ErrorType::HttpRequestServiceUnavailable,
        504 => ErrorType::HttpRequestGatewayTimeout,
        _ => ErrorType::HttpRequestOtherError,
    }
}

/// Categorizes the terminal cause of a download.
pub fn categorize_failure(failure: &DownloadFailure) -> ErrorType {
    match failure {
        DownloadFailure::Status(code) => categorize_status(*code),
        DownloadFailure::Transport { kind, .. } => *kind,
        DownloadFailure::InvalidUrl(_) => ErrorType::InvalidUrl,
        DownloadFailure::BodyTooLarge { .. } => ErrorType::BodyTooLarge,
        DownloadFailure::Cancelled => ErrorType::Cancelled,
        DownloadFailure::WorkerLost => ErrorType::WorkerLost,
    }
}

/// Determines if a transport error raised while sending a request is retriable.
///
/// # Retriable Errors
///
/// - Network timeouts, connection failures, request errors
/// - Body and decode errors (the connection broke while reading)
///
/// # Non-Retriable Errors
///
/// - Builder errors (malformed URL or header)
/// - Redirect errors (loop or too many hops)
pub fn is_retriable_transport(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() {
        return false;
    }
    // Unknown network errors may be transient
    true
}

/// Records the terminal cause of a download in the statistics.
pub fn update_error_stats(stats: &ProcessingStats, failure: &DownloadFailure) {
    stats.increment_error(categorize_failure(failure));
}
