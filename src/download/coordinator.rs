//! Parallel download coordinator.
//!
//! URLs go into a bounded queue drained by a fixed number of tokio workers.
//! Each worker owns one [`RetryExecutor`], draws a proxy per URL when a pool
//! is configured, and tags every outcome with the URL's input position. The
//! outcomes are put back in input order before returning.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::backoff::{Sleeper, TokioSleeper};
use super::executor::{FetchedResponse, RetryExecutor};
use super::proxy::{ProxyEntry, ProxyPool};
use crate::config::{DownloadOptions, FailurePolicy};
use crate::error_handling::{
    update_error_stats, DownloadError, DownloadFailure, Error, InfoType, ProcessingStats, Result,
};
use crate::initialization::init_download_client;

/// Result of downloading one URL.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// Position of the URL in the input list
    pub index: usize,
    pub url: String,
    /// Attempts made, 0 when the URL was cancelled before its first one
    pub attempts: u32,
    /// Proxy the URL was fetched through
    pub proxy: Option<ProxyEntry>,
    /// Response or terminal error, never both
    pub result: std::result::Result<FetchedResponse, DownloadError>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&FetchedResponse> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&DownloadError> {
        self.result.as_ref().err()
    }

    /// Outcome of a URL that was never fetched to completion.
    fn failed(index: usize, url: String, cause: DownloadFailure) -> Self {
        let error = DownloadError {
            url: url.clone(),
            cause,
            attempts: 0,
        };
        Self {
            index,
            url,
            attempts: 0,
            proxy: None,
            result: Err(error),
        }
    }
}

/// Direct client plus one client per distinct proxy.
struct ClientSet {
    direct: reqwest::Client,
    proxied: HashMap<ProxyEntry, reqwest::Client>,
}

impl ClientSet {
    fn build(options: &DownloadOptions, pool: Option<&ProxyPool>) -> Result<Self> {
        let direct = init_download_client(options, None)?;
        let mut proxied = HashMap::new();
        for entry in pool.map(ProxyPool::entries).unwrap_or_default() {
            if !proxied.contains_key(entry) {
                proxied.insert(entry.clone(), init_download_client(options, Some(entry))?);
            }
        }
        Ok(Self { direct, proxied })
    }

    fn for_proxy(&self, proxy: Option<&ProxyEntry>) -> &reqwest::Client {
        proxy
            .and_then(|p| self.proxied.get(p))
            .unwrap_or(&self.direct)
    }
}

/// Downloads many URLs concurrently.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wayback_harvest::config::DownloadOptions;
/// use wayback_harvest::download::{ParallelDownloader, ProxyPool};
///
/// # async fn run() -> wayback_harvest::Result<()> {
/// let pool = Arc::new(ProxyPool::load_file("proxies.txt")?);
/// let outcomes = ParallelDownloader::new(DownloadOptions::default())
///     .with_proxy_pool(pool)
///     .run(vec!["https://web.archive.org/web/20200101000000id_/https://example.com/".into()])
///     .await?;
/// for outcome in outcomes {
///     println!("{} -> {}", outcome.url, outcome.is_success());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ParallelDownloader {
    options: Arc<DownloadOptions>,
    pool: Option<Arc<ProxyPool>>,
    sleeper: Arc<dyn Sleeper>,
    stats: Arc<ProcessingStats>,
}

impl ParallelDownloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self {
            options: Arc::new(options),
            pool: None,
            sleeper: Arc::new(TokioSleeper),
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Routes each URL through the next proxy of `pool`.
    pub fn with_proxy_pool(mut self, pool: Arc<ProxyPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Failure and event counters of the runs made so far.
    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Downloads every URL and returns one outcome per URL, in input order.
    ///
    /// Per-URL failures are reported in their outcome. With
    /// [`FailurePolicy::FailFast`] the first terminal failure stops workers
    /// from starting new attempts or URLs; those URLs report
    /// `DownloadFailure::Cancelled`. A URL whose worker panicked mid-fetch
    /// reports `DownloadFailure::WorkerLost`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for zero workers or an invalid retry
    /// policy, and `Error::Initialization` if an HTTP client cannot be built.
    pub async fn run(&self, urls: Vec<String>) -> Result<Vec<DownloadOutcome>> {
        if self.options.workers == 0 {
            return Err(Error::config("worker count must be at least 1"));
        }
        self.options.retry.validate()?;

        let total = urls.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let clients = Arc::new(ClientSet::build(&self.options, self.pool.as_deref())?);
        let input = urls.clone();
        let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
            Arc::new(Mutex::new(urls.into_iter().enumerate().collect()));
        let cancel = CancellationToken::new();
        let worker_count = self.options.workers.min(total);
        info!("Downloading {total} URLs with {worker_count} workers");

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut tasks = FuturesUnordered::new();
        for worker_id in 0..worker_count {
            let mut executor = RetryExecutor::new(Arc::clone(&self.options))
                .with_sleeper(Arc::clone(&self.sleeper))
                .with_stats(Arc::clone(&self.stats));
            if self.options.failure_policy == FailurePolicy::FailFast {
                executor = executor.with_cancellation(cancel.clone());
            }
            let worker = Worker {
                id: worker_id,
                executor,
                clients: Arc::clone(&clients),
                pool: self.pool.clone(),
                queue: Arc::clone(&queue),
                cancel: cancel.clone(),
                policy: self.options.failure_policy,
                stats: Arc::clone(&self.stats),
                outcomes: sender.clone(),
            };
            tasks.push(tokio::spawn(worker.run()));
        }
        // The channel closes once every worker has finished or died
        drop(sender);

        let mut slots: Vec<Option<DownloadOutcome>> = (0..total).map(|_| None).collect();
        while let Some(outcome) = receiver.recv().await {
            let index = outcome.index;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        while let Some(joined) = tasks.next().await {
            if let Err(e) = joined {
                error!("Download worker terminated abnormally: {e}");
            }
        }

        // URLs still queued after every worker died were never attempted
        let leftover: Vec<(usize, String)> = queue.lock().await.drain(..).collect();
        for (index, url) in leftover {
            if let Some(slot) = slots.get_mut(index) {
                slot.get_or_insert_with(|| {
                    DownloadOutcome::failed(index, url, DownloadFailure::Cancelled)
                });
            }
        }

        // Any other gap is a URL whose worker died while fetching it
        let outcomes: Vec<DownloadOutcome> = slots
            .into_iter()
            .zip(input)
            .enumerate()
            .map(|(index, (slot, url))| {
                slot.unwrap_or_else(|| {
                    error!("No outcome recorded for URL #{index}, its worker was lost");
                    update_error_stats(&self.stats, &DownloadFailure::WorkerLost);
                    DownloadOutcome::failed(index, url, DownloadFailure::WorkerLost)
                })
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            "Downloaded {succeeded}/{total} URLs ({} failed)",
            total - succeeded
        );
        self.stats.log_summary();
        Ok(outcomes)
    }
}

struct Worker {
    id: usize,
    executor: RetryExecutor,
    clients: Arc<ClientSet>,
    pool: Option<Arc<ProxyPool>>,
    queue: Arc<Mutex<VecDeque<(usize, String)>>>,
    cancel: CancellationToken,
    policy: FailurePolicy,
    stats: Arc<ProcessingStats>,
    outcomes: mpsc::UnboundedSender<DownloadOutcome>,
}

impl Worker {
    /// Drains the queue, reporting each outcome as soon as it is known.
    async fn run(self) {
        loop {
            let next = self.queue.lock().await.pop_front();
            let Some((index, url)) = next else {
                break;
            };

            if self.cancel.is_cancelled() {
                self.report(DownloadOutcome::failed(index, url, DownloadFailure::Cancelled));
                continue;
            }

            let proxy = self.pool.as_ref().and_then(|pool| pool.next());
            if proxy.is_some() {
                self.stats.increment_info(InfoType::ProxyAssigned);
            }
            let client = self.clients.for_proxy(proxy.as_ref());
            let result = self.executor.fetch(client, &url).await;

            let attempts = match &result {
                Ok(response) => response.attempts,
                Err(e) => e.attempts,
            };
            if let Err(e) = &result {
                if self.policy == FailurePolicy::FailFast
                    && e.cause != DownloadFailure::Cancelled
                    && !self.cancel.is_cancelled()
                {
                    warn!("Worker {} stopping the run after: {e}", self.id);
                    self.cancel.cancel();
                }
            }

            self.report(DownloadOutcome {
                index,
                url,
                attempts,
                proxy,
                result,
            });
        }
    }

    fn report(&self, outcome: DownloadOutcome) {
        if self.outcomes.send(outcome).is_err() {
            warn!("Worker {} has no collector for its outcome", self.id);
        }
    }
}

/// Downloads `urls` with `options`, optionally through `pool`.
///
/// Shorthand for [`ParallelDownloader::run`].
pub async fn parallel_download(
    urls: Vec<String>,
    options: DownloadOptions,
    pool: Option<Arc<ProxyPool>>,
) -> Result<Vec<DownloadOutcome>> {
    let mut downloader = ParallelDownloader::new(options);
    if let Some(pool) = pool {
        downloader = downloader.with_proxy_pool(pool);
    }
    downloader.run(urls).await
}
