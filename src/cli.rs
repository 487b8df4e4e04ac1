// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - crawl: crawl a site and write sitemap.xml
// - validate: check an existing sitemap file
//
// Every crawl option is optional on the command line. Anything left out
// falls back to the config file (--config), then to built-in defaults.
// That is why the crawl flags are Options: `to_settings` turns them into a
// Settings layer that is merged on top of the file layer.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct definitions
// - Option<T>: "flag not given" is different from "flag given with a value"
// =============================================================================

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use site_mapper::config::Settings;
use site_mapper::links::ScopePolicy;

#[derive(Parser, Debug)]
#[command(
    name = "site-mapper",
    version,
    about = "Crawl a website and generate a sitemap.xml",
    long_about = "site-mapper crawls a website breadth-first from a seed URL, stays within \
                  the seed's host (or domain), and writes every page it could fetch to a \
                  sitemaps.org 0.9 sitemap."
)]
pub struct Cli {
    /// Show debug logs (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website and write its sitemap
    ///
    /// Example: site-mapper crawl https://example.com --max-depth 3
    Crawl(CrawlArgs),

    /// Check an existing sitemap file against the sitemap protocol
    ///
    /// Example: site-mapper validate public/sitemap.xml
    Validate {
        /// Path of the sitemap to check
        file: PathBuf,

        /// Output the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Seed URL to start from (may also come from the config file)
    pub seed_url: Option<String>,

    /// Where to write the sitemap
    #[arg(short, long, default_value = "sitemap.xml")]
    pub output: PathBuf,

    /// TOML file with default settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of pages to fetch [default: 1000]
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Maximum link depth from the seed page [default: 10]
    ///
    /// Depth 0 = just the seed page
    /// Depth 1 = seed page + all pages it links to
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Number of concurrent fetch workers [default: 8]
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Per-page timeout in seconds [default: 10]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause between requests of one worker, in milliseconds [default: 100]
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Which URLs belong to the site
    #[arg(long, value_enum)]
    pub scope: Option<ScopePolicy>,

    /// Skip matching paths: ".ext" or a glob such as "/private/*" (repeatable)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Do not skip images, archives, media, scripts and stylesheets
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Maximum number of <url> entries [default: 50000]
    #[arg(long)]
    pub max_entries: Option<usize>,

    /// Maximum sitemap size in bytes [default: 52428800]
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Retries for timeouts and connection errors [default: 0]
    #[arg(long)]
    pub retries: Option<u32>,

    /// <changefreq> for every entry, or "none" to omit it [default: monthly]
    #[arg(long)]
    pub changefreq: Option<String>,

    /// <priority> for every entry [default: 0.5]
    #[arg(long, conflicts_with = "no_priority")]
    pub priority: Option<f32>,

    /// Omit <priority>
    #[arg(long)]
    pub no_priority: bool,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Output the run report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Write the sitemap even if it has violations
    #[arg(long)]
    pub force: bool,
}

impl CrawlArgs {
    // Builds the command-line settings layer
    //
    // Boolean flags only count when they are set, so an unset flag never
    // overrides the config file.
    pub fn to_settings(&self) -> Settings {
        Settings {
            seed_url: self.seed_url.clone(),
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            concurrency: self.concurrency,
            timeout_secs: self.timeout,
            delay_ms: self.delay_ms,
            scope: self.scope,
            exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            default_excludes: self.no_default_excludes.then_some(false),
            max_entries: self.max_entries,
            max_bytes: self.max_bytes,
            retries: self.retries,
            retry_backoff_ms: None,
            changefreq: self.changefreq.clone(),
            priority: self.priority,
            no_priority: self.no_priority.then_some(true),
            user_agent: self.user_agent.clone(),
        }
    }
}


// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is `CrawlArgs` a separate struct?
//    - #[derive(Args)] lets a subcommand carry a named struct instead of
//      inline fields, so it can have methods like `to_settings`
//
// 2. Why `then_some` for the boolean flags?
//    - A bool flag cannot say "not given", so `false` becomes None and the
//      config file value (if any) is kept
// -----------------------------------------------------------------------------
