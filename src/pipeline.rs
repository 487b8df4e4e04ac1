// src/pipeline.rs
// =============================================================================
// Glues the crawl and the sitemap together.
//
// 1. Run the crawler; every PageResult goes straight into a SitemapBuilder
//    (the builder lives on the coordinator task, so it needs no locking)
// 2. When the crawl ends, finalize the document with the completion time
// 3. Validate it against the configured limits
//
// Writing the file is left to the caller, who decides what to do with a
// document that has violations.
// =============================================================================

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::crawl::{CrawlStats, Crawler, FailedPage};
use crate::sitemap::{validate, SitemapBuilder, SitemapDocument, ValidationReport, Violation};

/// Everything one crawl produced.
#[derive(Debug, Clone)]
pub struct SitemapRun {
    pub document: SitemapDocument,
    pub stats: CrawlStats,
    /// Successful pages left out because the entry cap was reached
    pub dropped: usize,
    pub report: ValidationReport,
    pub completed_at: DateTime<Utc>,
}

impl SitemapRun {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

// Crawls the configured site and assembles the sitemap
pub async fn build_sitemap(crawler: &Crawler) -> SitemapRun {
    let config = crawler.config();
    let mut builder = SitemapBuilder::new(config.limits.max_entries, config.entry_defaults);

    let stats = crawler
        .run(|result| {
            builder.add(result);
        })
        .await;

    let dropped = builder.dropped();
    if dropped > 0 {
        warn!(
            dropped,
            max_entries = config.limits.max_entries,
            "entry cap reached, some pages left out of the sitemap"
        );
    }

    let completed_at = Utc::now();
    let document = builder.finalize(completed_at);
    let report = validate(&document, &config.limits);

    info!(
        entries = document.len(),
        violations = report.len(),
        "sitemap assembled"
    );

    SitemapRun {
        document,
        stats,
        dropped,
        report,
        completed_at,
    }
}

/// Summary printed at the end of a `crawl` command (table or JSON).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: String,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub urls_discovered: usize,
    pub entries: usize,
    pub entries_dropped: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    pub failures: Vec<FailedPage>,
    pub violations: Vec<Violation>,
    /// Where the sitemap was written, if it was
    pub output: Option<PathBuf>,
    pub bytes_written: Option<usize>,
}

impl RunReport {
    pub fn new(seed: &str, run: &SitemapRun) -> Self {
        Self {
            seed: seed.to_string(),
            pages_fetched: run.stats.pages_fetched,
            pages_failed: run.stats.pages_failed,
            urls_discovered: run.stats.urls_discovered,
            entries: run.document.len(),
            entries_dropped: run.dropped,
            cancelled: run.stats.cancelled,
            elapsed_ms: run.stats.elapsed.as_millis() as u64,
            failures: run.stats.failures.clone(),
            violations: run.report.violations.clone(),
            output: None,
            bytes_written: None,
        }
    }

    pub fn written_to(mut self, path: PathBuf, bytes: usize) -> Self {
        self.output = Some(path);
        self.bytes_written = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlConfig, Settings};
    use crate::crawl::{RenderedPage, Renderer};
    use crate::error::FetchError;
    use crate::sitemap::{serialize, validate_xml, ChangeFreq};
    use async_trait::async_trait;
    use chrono::Datelike;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    // Serves fixed pages; anything unknown hangs past the timeout
    struct StaticSite {
        pages: HashMap<String, String>,
    }

    impl StaticSite {
        fn new(pages: &[(&str, &[&str])]) -> Arc<Self> {
            let pages = pages
                .iter()
                .map(|(url, links)| {
                    let body: String = links
                        .iter()
                        .map(|href| format!(r#"<a href="{href}">x</a>"#))
                        .collect();
                    (url.to_string(), format!("<html><body>{body}</body></html>"))
                })
                .collect();
            Arc::new(Self { pages })
        }
    }

    #[async_trait]
    impl Renderer for StaticSite {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<RenderedPage, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(RenderedPage::new(html.clone(), 200)),
                None => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(RenderedPage::new("", 200))
                }
            }
        }
    }

    fn settings(max_pages: usize, max_depth: usize) -> Settings {
        Settings {
            seed_url: Some("https://example.com/".to_string()),
            max_pages: Some(max_pages),
            max_depth: Some(max_depth),
            concurrency: Some(4),
            delay_ms: Some(0),
            ..Settings::default()
        }
    }

    fn crawler(config: CrawlConfig, site: Arc<StaticSite>) -> Crawler {
        Crawler::new(config, site)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sitemap_for_two_page_site() {
        let site = StaticSite::new(&[
            ("https://example.com/", &["/b", "https://other.com/"]),
            ("https://example.com/b", &["/"]),
        ]);
        let config = settings(10, 2).into_config().unwrap();

        let run = build_sitemap(&crawler(config, site)).await;

        let locs: Vec<_> = run.document.locs().collect();
        assert_eq!(locs, vec!["https://example.com/", "https://example.com/b"]);
        assert!(run.is_valid());
        assert_eq!(run.dropped, 0);

        let today = run.completed_at.date_naive();
        for entry in run.document.entries() {
            assert_eq!(entry.lastmod, Some(today));
            assert_eq!(entry.changefreq, Some(ChangeFreq::Monthly));
            assert_eq!(entry.priority, Some(0.5));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_entry_cap_keeps_document_valid() {
        let site = StaticSite::new(&[
            ("https://example.com/", &["/b", "/c"]),
            ("https://example.com/b", &[]),
            ("https://example.com/c", &[]),
        ]);
        let config = Settings {
            max_entries: Some(2),
            ..settings(10, 2)
        }
        .into_config()
        .unwrap();

        let run = build_sitemap(&crawler(config, site)).await;

        assert_eq!(run.stats.pages_fetched, 3);
        assert_eq!(run.document.len(), 2);
        assert_eq!(run.dropped, 1);
        assert!(run.is_valid());
        assert_eq!(run.document.locs().next(), Some("https://example.com/"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timed_out_page_left_out() {
        let site = StaticSite::new(&[
            ("https://example.com/", &["/d", "/e"]),
            ("https://example.com/e", &[]),
        ]);
        let config = Settings {
            timeout_secs: Some(1),
            ..settings(10, 2)
        }
        .into_config()
        .unwrap();

        let run = build_sitemap(&crawler(config, site)).await;

        let locs: Vec<_> = run.document.locs().collect();
        assert_eq!(locs.len(), 2);
        assert!(!locs.contains(&"https://example.com/d"));
        assert_eq!(run.stats.pages_failed, 1);
        assert!(matches!(
            run.stats.failures[0].error,
            FetchError::Timeout { .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_seed_gives_invalid_sitemap() {
        // Nothing is served, so the seed times out
        let site = StaticSite::new(&[]);
        let config = Settings {
            timeout_secs: Some(1),
            ..settings(10, 2)
        }
        .into_config()
        .unwrap();

        let run = build_sitemap(&crawler(config, site)).await;

        assert_eq!(run.stats.pages_failed, 1);
        assert!(run.document.is_empty());
        assert!(!run.is_valid());
        assert_eq!(run.report.violations, vec![Violation::NoEntries]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_written_sitemap_reparses_to_same_entries() {
        let site = StaticSite::new(&[
            ("https://example.com/", &["/a?x=1&y=2", "/b"]),
            ("https://example.com/a?x=1&y=2", &[]),
            ("https://example.com/b", &[]),
        ]);
        let config = settings(10, 2).into_config().unwrap();
        let limits = config.limits;

        let run = build_sitemap(&crawler(config, site)).await;
        let xml = String::from_utf8(serialize(&run.document, &limits).unwrap()).unwrap();
        let (report, reparsed) = validate_xml(&xml, &limits);

        assert!(report.is_valid());
        assert_eq!(reparsed, run.document);
        assert!(reparsed.entries()[0].lastmod.unwrap().year() >= 2024);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_report() {
        let site = StaticSite::new(&[("https://example.com/", &[])]);
        let config = settings(10, 2).into_config().unwrap();

        let run = build_sitemap(&crawler(config, site)).await;
        let report = RunReport::new("https://example.com/", &run)
            .written_to(PathBuf::from("sitemap.xml"), 321);

        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.entries, 1);
        assert_eq!(report.bytes_written, Some(321));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["output"], "sitemap.xml");
        assert_eq!(json["violations"], serde_json::json!([]));
    }
}
