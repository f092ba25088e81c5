//! HTTP client initialization.
//!
//! This module builds the `reqwest` clients used for index queries and for
//! archived-content downloads. Clients are cheap to clone and safe to share
//! across tasks.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::ClientBuilder;

use crate::config::{DownloadOptions, IndexClientConfig, TCP_CONNECT_TIMEOUT_SECS};
use crate::download::ProxyEntry;
use crate::error_handling::InitializationError;

/// Maximum number of redirect hops to follow when redirects are enabled
const MAX_REDIRECT_HOPS: usize = 10;

/// Initializes the HTTP client used for CDX index requests.
///
/// Creates a `reqwest::Client` configured with the User-Agent and timeout of
/// `config` plus a TCP connect timeout.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_index_client(
    config: &IndexClientConfig,
) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Initializes an HTTP client for archived-content downloads.
///
/// The per-attempt timeout, redirect policy and User-Agent come from
/// `options`. When `proxy` is given, every request of the client goes through
/// it; reqwest binds proxies at build time, so each proxy needs its own client.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the proxy URL is invalid
/// or client creation fails.
pub fn init_download_client(
    options: &DownloadOptions,
    proxy: Option<&ProxyEntry>,
) -> Result<reqwest::Client, InitializationError> {
    let redirect = if options.follow_redirects {
        Policy::limited(MAX_REDIRECT_HOPS)
    } else {
        Policy::none()
    };

    let mut builder = ClientBuilder::new()
        .timeout(options.timeout)
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS).min(options.timeout))
        .redirect(redirect)
        .user_agent(options.user_agent.clone());

    if let Some(entry) = proxy {
        builder = builder.proxy(entry.to_reqwest_proxy()?);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_index_client_default_config() {
        assert!(init_index_client(&IndexClientConfig::default()).is_ok());
    }

    #[test]
    fn test_init_download_client_with_proxy() {
        let entry: ProxyEntry = "10.0.0.1:8080:user:secret".parse().expect("valid proxy");
        let client = init_download_client(&DownloadOptions::default(), Some(&entry));
        assert!(client.is_ok());
    }

    #[test]
    fn test_init_download_client_without_redirects() {
        let options = DownloadOptions {
            follow_redirects: false,
            ..Default::default()
        };
        assert!(init_download_client(&options, None).is_ok());
    }
}
