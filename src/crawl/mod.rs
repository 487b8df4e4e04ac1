// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first crawling starting from a seed URL (FIFO frontier)
// - A fixed pool of concurrent workers sharing one frontier
// - Same-host or same-domain scope, with path exclusions
// - Depth and page-count limits
// - Per-request timeout, optional retries, cooperative cancellation
//
// Submodules:
// - task: CrawlTask and PageResult
// - frontier: the shared queue + visited set
// - renderer: the Renderer trait and the reqwest-based HttpRenderer
// - pool: the worker pool and its coordinator (Crawler)
// =============================================================================

mod frontier;
mod pool;
mod renderer;
mod task;

pub use frontier::Frontier;
pub use pool::{CrawlStats, Crawler, RetryPolicy};
pub use renderer::{HttpRenderer, RenderedPage, Renderer};
pub use task::{CrawlTask, FailedPage, FetchedPage, PageResult};
