// src/links/scope.rs
// =============================================================================
// This module decides whether a normalized URL belongs to the crawl.
//
// A URL is in scope when all of these hold:
// 1. The scheme is http or https
// 2. The host matches the seed host under the scope policy
//    - SameHost: "blog.example.com" only matches "blog.example.com"
//    - SameDomain: "blog.example.com" matches "www.example.com" too
// 3. The path matches none of the exclusion rules (".pdf", "/private/*", ...)
//
// Extra filters (robots.txt for example) can be plugged in through the
// UrlFilter trait; they are consulted after the built-in checks.
// =============================================================================

use std::net::IpAddr;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Extensions of non-HTML assets that never end up in a sitemap.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".zip", ".gz", ".tar",
    ".rar", ".7z", ".exe", ".dmg", ".mp3", ".mp4", ".avi", ".mov", ".css", ".js", ".xml",
    ".json", ".woff", ".woff2", ".ttf",
];

// Second-level labels that sit under a country TLD ("example.co.uk")
const COMMON_SECOND_LEVEL: &[&str] = &["co", "com", "net", "org", "gov", "edu", "ac"];

/// How far from the seed host the crawl may wander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScopePolicy {
    /// Only the exact seed host
    #[default]
    SameHost,
    /// Any host under the seed's registrable domain
    SameDomain,
}

/// A single path exclusion rule.
#[derive(Debug, Clone)]
pub enum Exclusion {
    /// Case-insensitive extension match, stored lower-cased with the dot
    Extension(String),
    /// Glob over the whole path, compiled to an anchored regex
    Glob { pattern: String, regex: Regex },
}

impl Exclusion {
    // Parses one rule
    //
    // ".pdf"        -> Extension
    // "/private/*"  -> Glob ("*" = any run of characters, "?" = one character)
    pub fn parse(rule: &str) -> Result<Self, ConfigError> {
        let rule = rule.trim();
        if rule.starts_with('.') && !rule.contains(['/', '*', '?']) {
            return Ok(Self::Extension(rule.to_ascii_lowercase()));
        }

        let mut source = String::from("^");
        for ch in rule.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::Pattern {
                pattern: rule.to_string(),
                source,
            })?;

        Ok(Self::Glob {
            pattern: rule.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Extension(ext) => path.to_ascii_lowercase().ends_with(ext.as_str()),
            Self::Glob { regex, .. } => regex.is_match(path),
        }
    }
}

/// Additional, pluggable scope filter (robots.txt rules, custom blocklists).
pub trait UrlFilter: Send + Sync {
    fn allows(&self, url: &Url) -> bool;
}

/// Everything `in_scope` needs, built once from the seed URL and the config.
#[derive(Clone)]
pub struct Scope {
    seed_host: String,
    seed_domain: String,
    policy: ScopePolicy,
    exclusions: Vec<Exclusion>,
    filter: Option<Arc<dyn UrlFilter>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("seed_host", &self.seed_host)
            .field("policy", &self.policy)
            .field("exclusions", &self.exclusions.len())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Scope {
    pub fn new(seed: &Url, policy: ScopePolicy, exclusions: Vec<Exclusion>) -> Self {
        let seed_host = seed.host_str().unwrap_or_default().to_ascii_lowercase();
        Self {
            seed_domain: registrable_domain(&seed_host),
            seed_host,
            policy,
            exclusions,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn UrlFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    // Returns true when the crawler is allowed to fetch `url`
    pub fn in_scope(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };

        let host_ok = match self.policy {
            ScopePolicy::SameHost => host.eq_ignore_ascii_case(&self.seed_host),
            ScopePolicy::SameDomain => registrable_domain(host) == self.seed_domain,
        };
        if !host_ok {
            return false;
        }

        let path = url.path();
        if self.exclusions.iter().any(|rule| rule.matches(path)) {
            return false;
        }

        self.filter.as_ref().map_or(true, |filter| filter.allows(url))
    }
}

// Builds the default exclusion list
pub fn default_exclusions() -> Vec<Exclusion> {
    DEFAULT_EXCLUDED_EXTENSIONS
        .iter()
        .map(|ext| Exclusion::Extension((*ext).to_string()))
        .collect()
}

// Approximates the registrable domain of a host without a public suffix list
//
// Examples:
//   "www.example.com"     -> "example.com"
//   "shop.example.co.uk"  -> "example.co.uk"
//   "localhost"           -> "localhost"
//   "192.168.0.1"         -> "192.168.0.1"
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && COMMON_SECOND_LEVEL.contains(&second) {
        3
    } else {
        2
    };

    labels[labels.len().saturating_sub(keep)..].join(".")
}
