// src/sitemap/entry.rs
// =============================================================================
// The sitemap document model.
//
// A SitemapDocument is an ordered list of SitemapEntry records, one per
// <url> element in the output file. The order is the order in which pages
// were confirmed by the crawl; it carries no meaning for search engines.
//
// Protocol limits (https://www.sitemaps.org/protocol.html):
// - at most 50,000 URLs per file
// - at most 50MB (52,428,800 bytes) uncompressed per file
// - <loc> shorter than 2,048 characters
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Namespace of the sitemaps.org 0.9 schema.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Protocol maximum number of <url> entries per file.
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;

/// Protocol maximum uncompressed file size.
pub const DEFAULT_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Longest <loc> value the protocol accepts.
pub const MAX_LOC_LENGTH: usize = 2048;

/// How often a page is expected to change (<changefreq>).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub const ALL: [ChangeFreq; 7] = [
        ChangeFreq::Always,
        ChangeFreq::Hourly,
        ChangeFreq::Daily,
        ChangeFreq::Weekly,
        ChangeFreq::Monthly,
        ChangeFreq::Yearly,
        ChangeFreq::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeFreq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|freq| freq.as_str() == wanted)
            .ok_or_else(|| s.to_string())
    }
}

/// Rounds a priority to the one decimal the writer emits, so the value in
/// the document is exactly the value that ends up in the file.
pub fn round_priority(priority: f32) -> f32 {
    (priority * 10.0).round() / 10.0
}

/// One <url> record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
    /// Absolute page URL, already normalized by the crawler
    pub loc: String,
    /// Last modification date (written as YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<ChangeFreq>,
    /// Relative priority in [0.0, 1.0]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f32>,
}

impl SitemapEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }
}

/// A finished, immutable sitemap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SitemapDocument {
    entries: Vec<SitemapEntry>,
}

impl SitemapDocument {
    pub fn new(entries: Vec<SitemapEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SitemapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn locs(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.loc.as_str())
    }
}

/// Size limits applied by the builder, the validator and the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitemapLimits {
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl Default for SitemapLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}
