// src/crawl/pool.rs
// =============================================================================
// The fetch worker pool.
//
// How it works:
// 1. The seed URL goes into the frontier at depth 0
// 2. N workers (tokio tasks) loop:
//      dequeue -> fetch -> extract links -> report result -> enqueue links
// 3. Every result goes through one channel to the coordinator (Crawler::run),
//    which hands it to the caller's callback in arrival order
// 4. The run ends when the frontier is quiescent (nothing queued, nothing in
//    flight) or the cancellation token fires
//
// A worker reports a page BEFORE queueing the links found on it, so a page
// always reaches the coordinator ahead of the pages it led to.
//
// Failures (timeouts, connection errors, bad statuses, even a panicking
// renderer) are reported and the crawl goes on. Transient failures can be retried a bounded number of times.
// =============================================================================

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::frontier::Frontier;
use super::renderer::{is_success_status, RenderedPage, Renderer};
use super::task::{CrawlTask, FailedPage, FetchedPage, PageResult};
use crate::config::CrawlConfig;
use crate::error::FetchError;
use crate::links::{extract_links, normalize, Scope};

/// Bounded retry for transient fetch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one (0 = never retry)
    pub max_retries: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Counters collected while a crawl runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    /// Distinct URLs accepted by the frontier
    pub urls_discovered: usize,
    pub deepest_page: usize,
    pub failures: Vec<FailedPage>,
    pub cancelled: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl CrawlStats {
    fn record(&mut self, result: &PageResult) {
        self.deepest_page = self.deepest_page.max(result.depth());
        match result {
            PageResult::Success(_) => self.pages_fetched += 1,
            PageResult::Failure(page) => {
                self.pages_failed += 1;
                self.failures.push(page.clone());
            }
        }
    }
}

fn as_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

// Everything a worker needs, shared read-only between workers
struct WorkerContext {
    frontier: Arc<Frontier>,
    renderer: Arc<dyn Renderer>,
    scope: Scope,
    timeout: Duration,
    request_delay: Duration,
    retry: RetryPolicy,
    cancel: CancellationToken,
    results: mpsc::UnboundedSender<PageResult>,
}

/// Runs one crawl with a fixed pool of workers.
pub struct Crawler {
    config: Arc<CrawlConfig>,
    renderer: Arc<dyn Renderer>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlConfig, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config: Arc::new(config),
            renderer,
            cancel: CancellationToken::new(),
        }
    }

    // Uses the caller's token, so e.g. Ctrl-C can stop the crawl
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    // Crawls until quiescence or cancellation
    //
    // Parameters:
    //   on_result: called once per processed page, in arrival order, on the
    //              coordinator task (never concurrently)
    //
    // Returns: run statistics
    pub async fn run<F>(&self, mut on_result: F) -> CrawlStats
    where
        F: FnMut(&PageResult),
    {
        let started = Instant::now();
        let config = &self.config;

        let frontier = Arc::new(Frontier::new(config.max_pages, config.max_depth));
        frontier.try_enqueue(CrawlTask::seed(config.seed.clone()));

        // Cancelling the token closes the frontier, which wakes idle workers
        let watcher = {
            let frontier = Arc::clone(&frontier);
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                frontier.cancel();
            })
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let context = Arc::new(WorkerContext {
            frontier: Arc::clone(&frontier),
            renderer: Arc::clone(&self.renderer),
            scope: config.scope.clone(),
            timeout: config.timeout,
            request_delay: config.request_delay,
            retry: config.retry,
            cancel: self.cancel.clone(),
            results: tx,
        });

        info!(
            seed = %config.seed,
            workers = config.concurrency,
            max_pages = config.max_pages,
            max_depth = config.max_depth,
            "crawl started"
        );

        let workers: Vec<_> = (0..config.concurrency)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&context))))
            .collect();
        // Workers hold the only senders now; the channel closes when they exit
        drop(context);

        let mut stats = CrawlStats::default();
        while let Some(result) = rx.recv().await {
            stats.record(&result);
            on_result(&result);
        }

        for outcome in join_all(workers).await {
            if let Err(e) = outcome {
                warn!("worker task failed: {}", e);
            }
        }
        watcher.abort();

        stats.urls_discovered = frontier.seen_len();
        stats.cancelled = self.cancel.is_cancelled();
        stats.elapsed = started.elapsed();

        info!(
            fetched = stats.pages_fetched,
            failed = stats.pages_failed,
            cancelled = stats.cancelled,
            "crawl finished in {:?}",
            stats.elapsed
        );
        stats
    }
}

async fn worker_loop(id: usize, context: Arc<WorkerContext>) {
    debug!(worker = id, "worker started");

    loop {
        if context.cancel.is_cancelled() {
            break;
        }

        let Some(task) = context.frontier.dequeue().await else {
            break;
        };

        process_task(&context, task).await;
        context.frontier.mark_done();

        if !context.request_delay.is_zero() {
            tokio::time::sleep(context.request_delay).await;
        }
    }

    debug!(worker = id, "worker stopped");
}

async fn process_task(context: &WorkerContext, task: CrawlTask) {
    debug!(url = %task.url, depth = task.depth, "fetching");

    // A panic in the renderer or in link extraction becomes a failed page;
    // the worker keeps going and the task is still marked done
    let outcome = AssertUnwindSafe(fetch_page(context, &task.url))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(FetchError::other(panic_message(panic.as_ref()))));

    match outcome {
        Ok((links, last_modified)) => {
            let result = PageResult::Success(FetchedPage {
                url: task.url.clone(),
                depth: task.depth,
                links: links.clone(),
                last_modified,
            });
            if context.results.send(result).is_err() {
                return;
            }

            for link in links {
                context
                    .frontier
                    .try_enqueue(CrawlTask::new(link, task.depth + 1));
            }
        }
        Err(error) => {
            warn!(url = %task.url, "fetch failed: {}", error);
            let _ = context.results.send(PageResult::Failure(FailedPage {
                url: task.url,
                depth: task.depth,
                error,
            }));
        }
    }
}

// Fetches one page and returns its in-scope links plus its modification time
//
// Links resolve against the URL the page landed on after redirects
async fn fetch_page(
    context: &WorkerContext,
    url: &Url,
) -> Result<(Vec<Url>, Option<DateTime<Utc>>), FetchError> {
    let page = fetch_with_retry(context, url).await?;
    let links = in_scope_links(&context.scope, &page.html, page.base_url(url));
    Ok((links, page.last_modified))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("page handler panicked: {detail}")
}

// Calls the renderer, enforcing the timeout and the retry policy
async fn fetch_with_retry(context: &WorkerContext, url: &Url) -> Result<RenderedPage, FetchError> {
    let mut attempt = 0;

    loop {
        let result = match tokio::time::timeout(
            context.timeout,
            context.renderer.fetch(url, context.timeout),
        )
        .await
        {
            Ok(Ok(page)) if is_success_status(page.status) => Ok(page),
            Ok(Ok(page)) => Err(FetchError::Status {
                status: page.status,
            }),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(FetchError::Timeout {
                after: context.timeout,
            }),
        };

        match result {
            Err(error)
                if error.is_transient()
                    && attempt < context.retry.max_retries
                    && !context.cancel.is_cancelled() =>
            {
                attempt += 1;
                debug!(%url, attempt, "retrying after {}", error);
                tokio::time::sleep(context.retry.backoff).await;
            }
            other => return other,
        }
    }
}

// Extracts, normalizes and scope-filters the links of one page
//
// Malformed links are dropped here; they never count as crawl failures.
// Returns each in-scope URL once, in document order.
fn in_scope_links(scope: &Scope, html: &str, page_url: &Url) -> Vec<Url> {
    let extracted = extract_links(html, page_url);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in &extracted.hrefs {
        match normalize(href, Some(&extracted.base)) {
            Ok(url) => {
                if scope.in_scope(&url) && seen.insert(url.clone()) {
                    links.push(url);
                }
            }
            Err(e) => debug!(page = %page_url, "dropping link: {}", e),
        }
    }

    links
}
