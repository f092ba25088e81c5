//! Iteration over result sets larger than one response.
//!
//! Two strategies, one per iterator type:
//! - [`PageIterator`] walks `page=0,1,2,...` and stops on an empty page, a
//!   page shorter than the page size, or the probed page count.
//! - [`ResumeKeyIterator`] requests `limit=batch_size` with `showResumeKey`
//!   and follows each response's key until a response carries none.
//!
//! Both issue strictly sequential requests and hold at most one batch.

use futures::stream::{self, Stream};
use log::debug;

use super::client::IndexClient;
use super::query::QuerySpec;
use super::record::CaptureRecord;
use crate::config::MAX_PAGE_ITERATIONS;
use crate::error_handling::{Error, ParseError, Result};

/// Page-indexed iteration. Restartable with [`reset`](PageIterator::reset).
#[derive(Debug)]
pub struct PageIterator {
    client: IndexClient,
    spec: QuerySpec,
    next_page: u32,
    num_pages: Option<u32>,
    done: bool,
}

impl PageIterator {
    pub fn new(client: IndexClient, spec: QuerySpec) -> Self {
        Self {
            client,
            spec,
            next_page: 0,
            num_pages: None,
            done: false,
        }
    }

    /// Probes the page count first and never requests past it.
    pub async fn with_page_count(client: IndexClient, spec: QuerySpec) -> Result<Self> {
        let pages = client.num_pages(&spec).await?;
        let mut iter = Self::new(client, spec);
        iter.num_pages = Some(pages);
        Ok(iter)
    }

    /// Page count reported by the probe, if one was made.
    pub fn num_pages(&self) -> Option<u32> {
        self.num_pages
    }

    /// Fetches the next page, `Ok(None)` once iteration is over.
    ///
    /// An error ends the iteration; call [`reset`](Self::reset) to start over.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<CaptureRecord>>> {
        if self.done {
            return Ok(None);
        }
        if self.num_pages.is_some_and(|n| self.next_page >= n)
            || self.next_page as usize >= MAX_PAGE_ITERATIONS
        {
            self.done = true;
            return Ok(None);
        }

        let page = self.next_page;
        let response = match self.client.execute(&self.spec.for_page(page)).await {
            Ok(response) => response,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        self.next_page += 1;

        let rows = response.row_count();
        debug!("Page {page} of {} returned {rows} rows", self.spec.url());
        if rows == 0 {
            self.done = true;
            return Ok(None);
        }
        if self.spec.page_size().is_some_and(|size| rows < size as usize) {
            self.done = true;
        }
        Ok(Some(response.records))
    }

    /// Rewinds to page 0.
    pub fn reset(&mut self) {
        self.next_page = 0;
        self.done = false;
    }

    /// Lazy stream of page batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<CaptureRecord>>> {
        stream::unfold(self, |mut iter| async move {
            match iter.next_batch().await {
                Ok(Some(batch)) => Some((Ok(batch), iter)),
                Ok(None) => None,
                Err(e) => Some((Err(e), iter)),
            }
        })
    }
}

/// Resume-key iteration.
///
/// Keys are single-use, so the iterator cannot be rewound to the middle of a
/// result set; [`reset`](ResumeKeyIterator::reset) starts over from the top.
#[derive(Debug)]
pub struct ResumeKeyIterator {
    client: IndexClient,
    spec: QuerySpec,
    batch_size: u32,
    resume_key: Option<String>,
    requests: usize,
    done: bool,
}

impl ResumeKeyIterator {
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `batch_size` is 0.
    pub fn new(client: IndexClient, spec: QuerySpec, batch_size: u32) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config("resume batch size must be at least 1"));
        }
        Ok(Self {
            client,
            spec,
            batch_size,
            resume_key: None,
            requests: 0,
            done: false,
        })
    }

    /// Key of the next request, `None` before the first one.
    pub fn resume_key(&self) -> Option<&str> {
        self.resume_key.as_deref()
    }

    /// Fetches the next non-empty batch, `Ok(None)` once a response came back
    /// without a resume key.
    ///
    /// A response holding only a key is not the end: the iterator follows
    /// the key and keeps going.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<CaptureRecord>>> {
        while !self.done {
            if self.requests >= MAX_PAGE_ITERATIONS {
                self.done = true;
                break;
            }
            self.requests += 1;

            let request = self
                .spec
                .for_resume_batch(self.batch_size, self.resume_key.as_deref());
            let response = match self.client.execute(&request).await {
                Ok(response) => response,
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            };

            match response.resume_key {
                Some(key) if self.resume_key.as_deref() == Some(key.as_str()) => {
                    self.done = true;
                    return Err(Error::Parse(ParseError {
                        line: 0,
                        reason: format!("index repeated resume key '{key}'"),
                    }));
                }
                Some(key) => self.resume_key = Some(key),
                None => self.done = true,
            }
            debug!(
                "Resume batch {} of {} returned {} records",
                self.requests,
                self.spec.url(),
                response.records.len()
            );
            if !response.records.is_empty() {
                return Ok(Some(response.records));
            }
        }
        Ok(None)
    }

    /// Forgets the current key and starts again from the first batch.
    pub fn reset(&mut self) {
        self.resume_key = None;
        self.requests = 0;
        self.done = false;
    }

    /// Lazy stream of batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<CaptureRecord>>> {
        stream::unfold(self, |mut iter| async move {
            match iter.next_batch().await {
                Ok(Some(batch)) => Some((Ok(batch), iter)),
                Ok(None) => None,
                Err(e) => Some((Err(e), iter)),
            }
        })
    }
}
