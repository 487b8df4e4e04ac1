// src/sitemap/builder.rs
// =============================================================================
// Accumulates crawl results into a SitemapDocument.
//
// - Successful pages become entries, in the order they arrive
// - Failed pages are ignored
// - Once the entry cap is reached further pages are counted but not added
//   (the crawl itself keeps going)
// - Pages without a modification time get the crawl completion date when
//   the document is finalized
//
// The builder is owned by a single consumer (the crawl coordinator), so it
// needs no locking. URL uniqueness is guaranteed upstream by the frontier.
// =============================================================================

use chrono::{DateTime, Utc};

use super::entry::{round_priority, ChangeFreq, SitemapDocument, SitemapEntry};
use crate::crawl::PageResult;

/// Values applied to every entry the builder creates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntryDefaults {
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
}

#[derive(Debug)]
pub struct SitemapBuilder {
    entries: Vec<SitemapEntry>,
    max_entries: usize,
    defaults: EntryDefaults,
    dropped: usize,
}

impl SitemapBuilder {
    // Priorities are kept at one decimal, the precision written to the file
    pub fn new(max_entries: usize, defaults: EntryDefaults) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
            defaults: EntryDefaults {
                priority: defaults.priority.map(round_priority),
                ..defaults
            },
            dropped: 0,
        }
    }

    // Records one crawl result
    //
    // Returns: true if a new entry was added
    pub fn add(&mut self, result: &PageResult) -> bool {
        let PageResult::Success(page) = result else {
            return false;
        };

        if self.entries.len() >= self.max_entries {
            self.dropped += 1;
            return false;
        }

        self.entries.push(SitemapEntry {
            loc: page.url.to_string(),
            lastmod: page.last_modified.map(|date| date.date_naive()),
            changefreq: self.defaults.changefreq,
            priority: self.defaults.priority,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successful pages that did not fit under the entry cap.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    // Produces the final document, filling missing lastmod values with the
    // crawl completion date
    pub fn finalize(self, completed_at: DateTime<Utc>) -> SitemapDocument {
        let fallback = completed_at.date_naive();
        let entries = self
            .entries
            .into_iter()
            .map(|mut entry| {
                entry.lastmod.get_or_insert(fallback);
                entry
            })
            .collect();
        SitemapDocument::new(entries)
    }
}
