// src/sitemap/mod.rs
// =============================================================================
// This module turns crawl results into a sitemaps.org 0.9 document.
//
// Submodules:
// - entry: the document model (SitemapEntry, SitemapDocument, limits)
// - builder: accumulates PageResults into a document
// - validate: checks a document (or sitemap text) against the protocol
// - writer: renders the document as XML
// - reader: reads sitemap XML back for validation
//
// Flow: crawl results -> SitemapBuilder -> validate -> serialize -> file
// =============================================================================

mod builder;
mod entry;
mod reader;
mod validate;
mod writer;

pub use builder::{EntryDefaults, SitemapBuilder};
pub use entry::{
    round_priority, ChangeFreq, SitemapDocument, SitemapEntry, SitemapLimits, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_ENTRIES, MAX_LOC_LENGTH, SITEMAP_NAMESPACE,
};
pub use reader::{parse_sitemap, ParsedSitemap, RawUrl};
pub use validate::{validate, validate_xml, ValidationReport, Violation};
pub use writer::{escape_xml, serialize};
