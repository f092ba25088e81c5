//! Single-URL fetch with bounded retries.
//!
//! One attempt is a GET plus a full read of the body. An attempt fails
//! retryably on a transport error, a timeout, a body that breaks off
//! mid-read, or a status in the policy's retryable set. Anything else ends
//! the fetch immediately. Partial bodies are never returned.

use std::borrow::Cow;
use std::sync::Arc;

use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use super::backoff::{Sleeper, TokioSleeper};
use crate::config::DownloadOptions;
use crate::error_handling::{
    categorize_reqwest_error, is_retriable_transport, update_error_stats, DownloadError,
    DownloadFailure, InfoType, ProcessingStats,
};

/// A successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Complete body
    pub body: Vec<u8>,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

impl FetchedResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Why one attempt failed, and whether another one may follow.
struct AttemptFailure {
    failure: DownloadFailure,
    retryable: bool,
}

impl AttemptFailure {
    fn fatal(failure: DownloadFailure) -> Self {
        Self {
            failure,
            retryable: false,
        }
    }

    fn transport(error: &reqwest::Error) -> Self {
        Self {
            failure: DownloadFailure::Transport {
                kind: categorize_reqwest_error(error),
                message: error.to_string(),
            },
            retryable: is_retriable_transport(error),
        }
    }
}

/// Runs the retry loop of [`DownloadOptions::retry`] for one URL at a time.
///
/// The executor holds no per-URL state, so one instance serves a whole
/// worker. The HTTP client is passed per call because proxied fetches need
/// the client bound to their proxy.
#[derive(Clone)]
pub struct RetryExecutor {
    options: Arc<DownloadOptions>,
    sleeper: Arc<dyn Sleeper>,
    stats: Arc<ProcessingStats>,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    pub fn new(options: Arc<DownloadOptions>) -> Self {
        Self {
            options,
            sleeper: Arc::new(TokioSleeper),
            stats: Arc::new(ProcessingStats::new()),
            cancel: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Stops before any new attempt once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Fetches `url`, retrying per policy.
    ///
    /// # Errors
    ///
    /// Returns a `DownloadError` carrying the last cause and the number of
    /// attempts made when the fetch fails terminally or is cancelled.
    pub async fn fetch(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<FetchedResponse, DownloadError> {
        let policy = &self.options.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                debug!("Fetch of {url} cancelled after {attempts} attempt(s)");
                return Err(self.give_up(url, DownloadFailure::Cancelled, attempts));
            }

            attempts += 1;
            let AttemptFailure { failure, retryable } = match self.attempt(client, url).await {
                Ok(mut response) => {
                    response.attempts = attempts;
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            if !retryable || attempts >= max_attempts {
                warn!("Giving up on {url} after {attempts} attempt(s): {failure}");
                return Err(self.give_up(url, failure, attempts));
            }

            // The rng is not Send and must be dropped before the await
            let delay = policy.jittered_delay(attempts, &mut rand::rng());
            self.stats.increment_info(InfoType::RetryAttempt);
            debug!(
                "Attempt {attempts}/{max_attempts} for {url} failed ({failure}), retrying in {delay:?}"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    fn give_up(&self, url: &str, cause: DownloadFailure, attempts: u32) -> DownloadError {
        update_error_stats(&self.stats, &cause);
        DownloadError {
            url: url.to_string(),
            cause,
            attempts,
        }
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<FetchedResponse, AttemptFailure> {
        if let Err(e) = url::Url::parse(url) {
            return Err(AttemptFailure::fatal(DownloadFailure::InvalidUrl(format!(
                "{url}: {e}"
            ))));
        }

        let mut request = client.get(url);
        for (name, value) in &self.options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(AttemptFailure::fatal(DownloadFailure::InvalidUrl(
                    e.to_string(),
                )))
            }
            Err(e) => return Err(AttemptFailure::transport(&e)),
        };

        let status = response.status();
        let accepted = status.is_success()
            || (!self.options.follow_redirects && status.is_redirection());
        if !accepted {
            let code = status.as_u16();
            return Err(AttemptFailure {
                failure: DownloadFailure::Status(code),
                retryable: self.options.retry.is_retryable_status(code),
            });
        }

        let limit = self.options.max_body_size;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(AttemptFailure::fatal(DownloadFailure::BodyTooLarge {
                limit,
            }));
        }

        let headers = response.headers().clone();
        let body = if self.options.stream {
            self.read_streamed(response, url).await?
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AttemptFailure::transport(&e))?;
            if bytes.len() > limit {
                return Err(AttemptFailure::fatal(DownloadFailure::BodyTooLarge {
                    limit,
                }));
            }
            bytes.to_vec()
        };

        Ok(FetchedResponse {
            status: status.as_u16(),
            headers,
            body,
            attempts: 0,
        })
    }

    async fn read_streamed(
        &self,
        response: reqwest::Response,
        url: &str,
    ) -> Result<Vec<u8>, AttemptFailure> {
        let limit = self.options.max_body_size;
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    if body.len() + bytes.len() > limit {
                        return Err(AttemptFailure::fatal(DownloadFailure::BodyTooLarge {
                            limit,
                        }));
                    }
                    body.extend_from_slice(&bytes);
                }
                Err(e) => {
                    self.stats.increment_info(InfoType::StreamInterrupted);
                    debug!(
                        "Body of {url} broke off after {} bytes, discarding: {e}",
                        body.len()
                    );
                    return Err(AttemptFailure {
                        retryable: true,
                        ..AttemptFailure::transport(&e)
                    });
                }
            }
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_fails_after_one_attempt() {
        let executor = RetryExecutor::new(Arc::new(DownloadOptions::default()));
        let client = reqwest::Client::new();
        let err = executor.fetch(&client, "not a url").await.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.cause, DownloadFailure::InvalidUrl(_)));
        assert_eq!(
            executor
                .stats()
                .get_error_count(crate::error_handling::ErrorType::InvalidUrl),
            1
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let executor =
            RetryExecutor::new(Arc::new(DownloadOptions::default())).with_cancellation(token);
        let client = reqwest::Client::new();
        let err = executor
            .fetch(&client, "http://127.0.0.1:9/never")
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 0);
        assert_eq!(err.cause, DownloadFailure::Cancelled);
    }

    #[test]
    fn test_fetched_response_text_is_lossy() {
        let response = FetchedResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: vec![b'o', b'k', 0xff],
            attempts: 1,
        };
        assert_eq!(response.text(), "ok\u{fffd}");
    }
}
