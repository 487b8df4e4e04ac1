// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Two layers:
// - Settings: every knob as an Option, deserializable from a TOML file and
//   filled from command-line flags. Layers are merged with `merge`, where the
//   later layer wins (CLI > file > defaults).
// - CrawlConfig: the validated, immutable configuration for one run.
//
// Example config file:
//
//   seed_url = "https://example.com/"
//   max_pages = 500
//   max_depth = 4
//   concurrency = 8
//   timeout_secs = 15
//   scope = "same-domain"
//   exclude = ["/private/*", ".php"]
//   changefreq = "weekly"
//   priority = 0.8
// =============================================================================

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::crawl::RetryPolicy;
use crate::error::ConfigError;
use crate::links::{default_exclusions, normalize, Exclusion, Scope, ScopePolicy};
use crate::sitemap::{round_priority, ChangeFreq, EntryDefaults, SitemapLimits};

pub const DEFAULT_MAX_PAGES: usize = 1000;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_USER_AGENT: &str = concat!("site-mapper/", env!("CARGO_PKG_VERSION"));

/// Validated configuration for one crawl run. Read-only once built.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: Url,
    pub max_pages: usize,
    /// 0 = seed only
    pub max_depth: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    /// Pause each worker takes after a fetch
    pub request_delay: Duration,
    pub scope: Scope,
    pub limits: SitemapLimits,
    pub retry: RetryPolicy,
    pub entry_defaults: EntryDefaults,
    pub user_agent: String,
}

impl CrawlConfig {
    // Config with every default, for the given seed
    pub fn new(seed_url: &str) -> Result<Self, ConfigError> {
        Settings {
            seed_url: Some(seed_url.to_string()),
            ..Settings::default()
        }
        .into_config()
    }
}

/// One configuration layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub seed_url: Option<String>,
    pub max_pages: Option<usize>,
    pub max_depth: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub delay_ms: Option<u64>,
    pub scope: Option<ScopePolicy>,
    /// Extra exclusion rules (".ext" or path glob)
    pub exclude: Option<Vec<String>>,
    /// Set to false to drop the built-in asset extension list
    pub default_excludes: Option<bool>,
    pub max_entries: Option<usize>,
    pub max_bytes: Option<usize>,
    pub retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    /// A changefreq value, or "none" to omit the element
    pub changefreq: Option<String>,
    pub priority: Option<f32>,
    /// Set to true to omit <priority>
    pub no_priority: Option<bool>,
    pub user_agent: Option<String>,
}

impl Settings {
    // Loads one layer from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    // Layers `other` on top of `self`; fields set in `other` win
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            seed_url: other.seed_url.or(self.seed_url),
            max_pages: other.max_pages.or(self.max_pages),
            max_depth: other.max_depth.or(self.max_depth),
            concurrency: other.concurrency.or(self.concurrency),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            delay_ms: other.delay_ms.or(self.delay_ms),
            scope: other.scope.or(self.scope),
            exclude: other.exclude.or(self.exclude),
            default_excludes: other.default_excludes.or(self.default_excludes),
            max_entries: other.max_entries.or(self.max_entries),
            max_bytes: other.max_bytes.or(self.max_bytes),
            retries: other.retries.or(self.retries),
            retry_backoff_ms: other.retry_backoff_ms.or(self.retry_backoff_ms),
            changefreq: other.changefreq.or(self.changefreq),
            priority: other.priority.or(self.priority),
            no_priority: other.no_priority.or(self.no_priority),
            user_agent: other.user_agent.or(self.user_agent),
        }
    }

    // Validates the merged settings and fills in defaults
    pub fn into_config(self) -> Result<CrawlConfig, ConfigError> {
        let raw_seed = self
            .seed_url
            .ok_or_else(|| ConfigError::invalid_seed("", "no seed URL given"))?;
        let seed = normalize(&raw_seed, None)
            .map_err(|e| ConfigError::invalid_seed(raw_seed.as_str(), e))?;

        let max_pages = at_least("max_pages", self.max_pages.unwrap_or(DEFAULT_MAX_PAGES), 1)?;
        let concurrency = at_least(
            "concurrency",
            self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            1,
        )?;
        let timeout = match self.timeout_secs {
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    field: "timeout_secs",
                    min: 1,
                    value: 0,
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let limits = SitemapLimits {
            max_entries: at_least(
                "max_entries",
                self.max_entries
                    .unwrap_or(SitemapLimits::default().max_entries),
                1,
            )?,
            max_bytes: at_least(
                "max_bytes",
                self.max_bytes.unwrap_or(SitemapLimits::default().max_bytes),
                1,
            )?,
        };

        let mut exclusions = if self.default_excludes.unwrap_or(true) {
            default_exclusions()
        } else {
            Vec::new()
        };
        for rule in self.exclude.unwrap_or_default() {
            exclusions.push(Exclusion::parse(&rule)?);
        }
        let scope = Scope::new(&seed, self.scope.unwrap_or_default(), exclusions);

        let retry = RetryPolicy {
            max_retries: self.retries.unwrap_or(0),
            backoff: self
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(RetryPolicy::default().backoff),
        };

        let changefreq = match self.changefreq.as_deref().map(str::trim) {
            None => Some(ChangeFreq::Monthly),
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(value.parse::<ChangeFreq>().map_err(|value| {
                ConfigError::UnknownValue {
                    field: "changefreq",
                    value,
                }
            })?),
        };

        let priority = if self.no_priority.unwrap_or(false) {
            None
        } else {
            let priority = self.priority.unwrap_or(0.5);
            if !(0.0..=1.0).contains(&priority) {
                return Err(ConfigError::Priority(priority));
            }
            Some(round_priority(priority))
        };

        Ok(CrawlConfig {
            seed,
            max_pages,
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            concurrency,
            timeout,
            request_delay: self
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_DELAY),
            scope,
            limits,
            retry,
            entry_defaults: EntryDefaults {
                changefreq,
                priority,
            },
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<usize, ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange {
            field,
            min: min as u64,
            value: value as u64,
        });
    }
    Ok(value)
}
