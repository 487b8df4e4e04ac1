// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr)
// 3. Dispatch to the appropriate subcommand handler
// 4. Print a report (table or JSON, to stdout)
// 5. Exit with proper code (0 = success, 1 = sitemap violations, 2 = error)
//
// Rust concepts used:
// - async/await: the crawl runs many requests concurrently on tokio
// - Result<T, E> + anyhow: any error bubbles up to `main` and becomes exit 2
// - CancellationToken: Ctrl-C stops the crawl and keeps what was found
// =============================================================================

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlArgs};
use site_mapper::config::Settings;
use site_mapper::crawl::{Crawler, HttpRenderer};
use site_mapper::pipeline::{build_sitemap, RunReport};
use site_mapper::sitemap::{serialize, validate_xml, SitemapLimits, ValidationReport};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins if set; otherwise info, or debug with -v
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = sitemap written / file valid
//   Ok(1) = sitemap has violations
//   Err = anything fatal (bad config, I/O error, oversized sitemap)
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Crawl(args) => handle_crawl(args).await,
        Commands::Validate { file, json } => handle_validate(&file, json).await,
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(args: CrawlArgs) -> Result<i32> {
    let file_layer = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => Settings::default(),
    };
    let config = file_layer
        .merge(args.to_settings())
        .into_config()
        .context("invalid crawl configuration")?;

    let seed = config.seed.to_string();
    let limits = config.limits;
    let renderer = Arc::new(HttpRenderer::new(&config.user_agent)?);

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    if !args.json {
        println!("🔍 Crawling: {}", seed);
        println!(
            "📊 Max depth: {}, max pages: {}, workers: {}",
            config.max_depth, config.max_pages, config.concurrency
        );
    }

    let crawler = Crawler::new(config, renderer).with_cancellation(cancel);
    let run = build_sitemap(&crawler).await;
    let mut report = RunReport::new(&seed, &run);

    if run.stats.cancelled {
        warn!("crawl interrupted, writing the pages found so far");
    }

    let exit_code = if run.is_valid() || args.force {
        let bytes = serialize(&run.document, &limits).context("failed to serialize sitemap")?;
        write_sitemap(&args.output, &bytes).await?;
        info!(path = %args.output.display(), bytes = bytes.len(), "sitemap written");
        report = report.written_to(args.output.clone(), bytes.len());
        if run.is_valid() {
            0
        } else {
            1
        }
    } else {
        warn!(
            violations = run.report.len(),
            "sitemap not written, pass --force to write it anyway"
        );
        1
    };

    print_crawl_report(&report, args.json)?;
    Ok(exit_code)
}

// Ctrl-C cancels the crawl; the partial sitemap is still produced
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping crawl");
            cancel.cancel();
        }
    });
}

async fn write_sitemap(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

// Handles the 'validate' subcommand
async fn handle_validate(path: &Path, json: bool) -> Result<i32> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let (report, doc) = validate_xml(&text, &SitemapLimits::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("🔍 Validating: {}", path.display());
        println!("📄 {} entr{} found", doc.len(), if doc.len() == 1 { "y" } else { "ies" });
        print_violations(&report);
        if report.is_valid() {
            println!("✅ Sitemap is valid");
        }
    }

    Ok(if report.is_valid() { 0 } else { 1 })
}

// Prints the crawl report either as a table or JSON
fn print_crawl_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints failed pages and a summary as a human-readable table
fn print_table(report: &RunReport) {
    if !report.failures.is_empty() {
        println!();
        println!("{:<60} {:<6} {:<30}", "FAILED URL", "DEPTH", "ERROR");
        println!("{}", "=".repeat(96));

        for failure in &report.failures {
            let url = failure.url.as_str();
            // Truncate URL if too long for display
            let url_display = if url.chars().count() > 57 {
                format!("{}...", url.chars().take(57).collect::<String>())
            } else {
                url.to_string()
            };
            println!("{:<60} {:<6} {:<30}", url_display, failure.depth, failure.error);
        }
    }

    if !report.violations.is_empty() {
        println!();
        for violation in &report.violations {
            println!("   ⚠️  {}", violation);
        }
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Fetched: {}", report.pages_fetched);
    println!("   ❌ Failed: {}", report.pages_failed);
    println!("   🔗 Discovered: {}", report.urls_discovered);
    println!("   🗺️  Entries: {}", report.entries);
    if report.entries_dropped > 0 {
        println!("   ✂️  Over entry cap: {}", report.entries_dropped);
    }
    if report.cancelled {
        println!("   ⏹️  Interrupted");
    }
    println!("   ⏱️  Took: {:.1}s", report.elapsed_ms as f64 / 1000.0);

    match (&report.output, report.bytes_written) {
        (Some(path), Some(bytes)) => println!("💾 Wrote {} ({} bytes)", path.display(), bytes),
        _ => println!("🚫 No sitemap written"),
    }
}

fn print_violations(report: &ValidationReport) {
    if report.is_empty() {
        return;
    }
    println!("❌ {} violation(s):", report.len());
    for violation in report.iter() {
        println!("   ⚠️  {}", violation);
    }
}
