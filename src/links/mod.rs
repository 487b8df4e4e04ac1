// src/links/mod.rs
// =============================================================================
// This module contains everything that deals with individual links.
//
// Submodules:
// - extract: Pulls raw href values out of rendered HTML
// - normalize: Turns raw hrefs into canonical absolute URLs
// - scope: Decides whether a canonical URL belongs to the crawl
//
// The crawl engine only ever sees URLs that went through normalize + scope.
// =============================================================================

mod extract;
mod normalize;
mod scope;

pub use extract::{extract_links, ExtractedLinks};
pub use normalize::normalize;
pub use scope::{default_exclusions, Exclusion, Scope, ScopePolicy, UrlFilter};
