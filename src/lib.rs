// src/lib.rs
// =============================================================================
// site-mapper: crawl a website and write a sitemaps.org sitemap for it.
//
// Modules:
// - links: normalize hrefs into canonical URLs and decide crawl scope
// - crawl: the frontier, the worker pool and the page renderer
// - sitemap: the document model, builder, validator, XML writer/reader
// - pipeline: runs a crawl into a validated sitemap
// - config: layered settings and the validated CrawlConfig
// - error: error types shared by all of the above
//
// The binary (src/main.rs) is a thin clap front end over this library.
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod links;
pub mod pipeline;
pub mod sitemap;
