//! CDX index client.

use log::debug;
use reqwest::header::COOKIE;

use super::collapse;
use super::parse::{parse_page_count, parse_response, CdxResponse};
use super::query::{MatchType, QueryBuilder, QuerySpec, SortType};
use super::record::CaptureRecord;
use crate::config::{IndexClientConfig, CDX_AUTH_COOKIE, MAX_BODY_EXCERPT_CHARS};
use crate::error_handling::{Error, Result};
use crate::initialization::init_index_client;

/// Client for the CDX index.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct IndexClient {
    http: reqwest::Client,
    config: IndexClientConfig,
}

impl IndexClient {
    /// Creates a client with its own HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Initialization` if the HTTP client cannot be built.
    pub fn new(config: IndexClientConfig) -> Result<Self> {
        let http = init_index_client(&config)?;
        Ok(Self { http, config })
    }

    /// Creates a client on top of an existing transport.
    pub fn with_client(http: reqwest::Client, config: IndexClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &IndexClientConfig {
        &self.config
    }

    /// Starts a query for `url`.
    pub fn query(&self, url: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(url)
    }

    /// Sends one request for `spec` and parses the whole response,
    /// including the resume key when one was requested.
    ///
    /// # Errors
    ///
    /// - `Error::Transport` when the request cannot be completed
    /// - `Error::Index` for a non-2xx answer
    /// - `Error::Parse` when the body is unreadable or every row is malformed
    pub async fn execute(&self, spec: &QuerySpec) -> Result<CdxResponse> {
        let body = self.fetch_body(spec).await?;
        let response = parse_response(
            &body,
            spec.output(),
            &spec.field_names(),
            spec.show_resume_key(),
        )?;
        debug!(
            "Index returned {} records for {} ({} skipped, resume key: {})",
            response.records.len(),
            spec.url(),
            response.skipped_rows,
            response.resume_key.is_some()
        );
        Ok(response)
    }

    /// Runs `spec` and returns its records in the order the index sent them.
    ///
    /// An empty result is `Ok(vec![])`.
    pub async fn search(&self, spec: &QuerySpec) -> Result<Vec<CaptureRecord>> {
        Ok(self.execute(spec).await?.records)
    }

    /// Most recent capture of `url`, `None` when it was never captured.
    pub async fn get_latest(&self, url: &str) -> Result<Option<CaptureRecord>> {
        let spec = self.query(url).sort(SortType::Reverse).limit(1).build()?;
        Ok(self.search(&spec).await?.into_iter().next())
    }

    /// Earliest capture of `url`, `None` when it was never captured.
    pub async fn get_oldest(&self, url: &str) -> Result<Option<CaptureRecord>> {
        let spec = self.query(url).sort(SortType::Regular).limit(1).build()?;
        Ok(self.search(&spec).await?.into_iter().next())
    }

    /// Capture of `url` nearest to `timestamp` (any 4 to 14 digit prefix).
    pub async fn get_closest(&self, url: &str, timestamp: &str) -> Result<Option<CaptureRecord>> {
        let spec = self.query(url).closest(timestamp).limit(1).build()?;
        Ok(self.closest_captures(&spec).await?.into_iter().next())
    }

    /// Runs a closest-sorted query, collapses the result with the query's
    /// collapse keys, then ranks it by distance to the closest timestamp.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `spec` has no closest timestamp.
    pub async fn closest_captures(&self, spec: &QuerySpec) -> Result<Vec<CaptureRecord>> {
        let target = spec
            .closest()
            .ok_or_else(|| Error::config("closest ranking needs a closest timestamp"))?
            .to_string();
        let records = self.search(spec).await?;
        let collapsed = collapse::apply(records, spec.collapse());
        collapse::rank_by_closest(collapsed, &target)
    }

    /// Number of pages the index holds for `url`.
    pub async fn get_num_pages(
        &self,
        url: &str,
        match_type: Option<MatchType>,
        page_size: Option<i64>,
    ) -> Result<u32> {
        let mut builder = self.query(url);
        if let Some(match_type) = match_type {
            builder = builder.match_type(match_type);
        }
        if let Some(size) = page_size {
            builder = builder.page_size(size);
        }
        let spec = builder.build()?;
        self.num_pages(&spec).await
    }

    /// Page-count probe for an already built query.
    pub(crate) async fn num_pages(&self, spec: &QuerySpec) -> Result<u32> {
        let probe = spec.for_page_count();
        let body = self.fetch_body(&probe).await?;
        let pages = parse_page_count(&body)?;
        debug!("Index reports {pages} pages for {}", spec.url());
        Ok(pages)
    }

    async fn fetch_body(&self, spec: &QuerySpec) -> Result<String> {
        let params = spec.to_params();
        debug!("Index request {} {:?}", self.config.endpoint, params);

        let mut request = self.http.get(&self.config.endpoint).query(&params);
        if let Some(token) = &self.config.auth_token {
            request = request.header(COOKIE, format!("{CDX_AUTH_COOKIE}={token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            // The body is only used for the excerpt
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Index {
                status_code: status.as_u16(),
                body_excerpt: excerpt(&body),
            });
        }
        Ok(response.text().await?)
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(MAX_BODY_EXCERPT_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
