// src/crawl/task.rs
// =============================================================================
// Units of work flowing through the crawl engine.
//
// - CrawlTask: a URL waiting in the frontier, plus how many hops it is from
//   the seed
// - PageResult: what a worker reports after processing a CrawlTask
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::error::FetchError;

// A page waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: usize, // hops from the seed URL (seed = 0)
}

impl CrawlTask {
    pub fn new(url: Url, depth: usize) -> Self {
        Self { url, depth }
    }

    pub fn seed(url: Url) -> Self {
        Self::new(url, 0)
    }
}

/// A page the renderer returned successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedPage {
    pub url: Url,
    pub depth: usize,
    /// In-scope, normalized links found on the page
    pub links: Vec<Url>,
    /// Page-level modification time, when the renderer knows it
    pub last_modified: Option<DateTime<Utc>>,
}

/// A page that could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPage {
    pub url: Url,
    pub depth: usize,
    pub error: FetchError,
}

/// Outcome of processing one CrawlTask.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    Success(FetchedPage),
    Failure(FailedPage),
}

impl PageResult {
    pub fn url(&self) -> &Url {
        match self {
            PageResult::Success(page) => &page.url,
            PageResult::Failure(page) => &page.url,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            PageResult::Success(page) => page.depth,
            PageResult::Failure(page) => page.depth,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PageResult::Success(_))
    }
}
