// src/links/extract.rs
// =============================================================================
// This module pulls raw links out of rendered HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Extraction does NOT decide what is crawlable. It only returns the href
// values and the base URL they should be resolved against; the worker hands
// them to `normalize` and `Scope::in_scope`.
//
// Rust concepts:
// - Iterators: filter_map over selected elements
// - OnceLock: parse CSS selectors once and reuse them
// =============================================================================

use std::sync::OnceLock;

use scraper::{Html, Selector};
use url::Url;

/// Raw links found on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// URL that relative hrefs resolve against (the page URL or its <base href>)
    pub base: Url,
    /// href values in document order, untouched
    pub hrefs: Vec<String>,
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // "a[href]" is a constant, known-valid selector
    SELECTOR.get_or_init(|| Selector::parse("a[href], area[href]").unwrap())
}

fn base_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("base[href]").unwrap())
}

// Extracts all link targets from an HTML page
//
// Parameters:
//   html: the rendered HTML
//   page_url: the URL the page was fetched from
//
// Returns: the base URL plus every href value on <a> and <area> elements
//
// Example:
//   html = "<base href='/docs/'><a href='intro'>Intro</a>"
//   page_url = "https://example.com/"
//   result.base = "https://example.com/docs/", result.hrefs = ["intro"]
pub fn extract_links(html: &str, page_url: &Url) -> ExtractedLinks {
    let document = Html::parse_document(html);

    // Only the first <base> element counts, and only if it resolves
    let base = document
        .select(base_selector())
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or_else(|| page_url.clone());

    let hrefs = document
        .select(anchor_selector())
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect();

    ExtractedLinks { base, hrefs }
}
