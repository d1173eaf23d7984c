//! CLI entry point for the partlist tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use partlist_core::Bom;
use partlist_core::fetch::{
    CONNECT_TIMEOUT_SECS, CachePolicy, CachingFetcher, ContentCache, FetcherConfig,
    READ_TIMEOUT_SECS,
};
use partlist_core::part::{DEFAULT_PAGE_MAX_AGE, PageAdapter, PartFactory};
use tracing::{debug, info, warn};

mod cli;
mod config;
mod progress;

use cli::{Args, DEFAULT_TIMEOUT_SECS};
use config::FileConfig;

/// Exit code for a BOM that timed out or carries part errors.
const EXIT_INCOMPLETE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = config::load_file_config(args.config.as_deref())?;
    debug!(?file_config, "config loaded");

    let fetcher = Arc::new(
        CachingFetcher::new(fetcher_config(&args, &file_config), content_cache(&file_config))
            .context("Failed to build HTTP client")?,
    );

    let page_max_age = file_config
        .page_max_age_secs
        .map_or(DEFAULT_PAGE_MAX_AGE, Duration::from_secs);
    let mut factory = PartFactory::new(Arc::clone(&fetcher));
    factory.register(Box::new(PageAdapter::new(page_max_age)));
    let factory = Arc::new(factory);

    let concurrency = args.concurrency.or(file_config.concurrency).unwrap_or(1);
    let max_parts = args.max_parts.or(file_config.max_parts).unwrap_or(0);
    let timeout = Duration::from_secs(
        args.timeout_secs
            .or(file_config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    let bom = Bom::from_url(&args.url, &factory)
        .with_context(|| format!("Cannot build a BOM for '{}'", args.url))?
        .with_concurrency(usize::from(concurrency))
        .with_maximum_parts(max_parts);
    let bom = Arc::new(bom);
    info!(url = %bom.url(), timeout_secs = timeout.as_secs(), max_parts, "Resolving BOM");

    let use_spinner = progress::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        args.json,
        progress::is_dumb_terminal(),
    );
    let (spinner, stop) = progress::spawn_progress_ui(use_spinner, Arc::clone(&bom));

    let outcome = bom.resolve(timeout).await;

    progress::stop_progress_ui(spinner, &stop).await;

    let resolved = outcome.context("BOM resolution aborted")?;
    info!(
        url_requests = fetcher.url_requests(),
        network_requests = fetcher.network_requests(),
        "Fetch statistics"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bom.summary())?);
    } else {
        print_table(&bom);
    }

    let valid = bom.is_valid();
    if !resolved {
        warn!(rows = bom.row_count(), "BOM is only partially resolved");
    }
    if !valid {
        for row in bom.rows() {
            if let Some(err) = row.part().refresh_error() {
                warn!(id = %row.id(), error = %err, "Part failed to refresh");
            }
        }
    }

    Ok(if resolved && valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INCOMPLETE)
    })
}

fn fetcher_config(args: &Args, file: &FileConfig) -> FetcherConfig {
    let connect = file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS);
    let read = file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS);
    let mut config = FetcherConfig::from_env()
        .caching(!args.no_cache && file.caching.unwrap_or(true))
        .accept_invalid_certs(args.insecure || file.accept_invalid_certs.unwrap_or(false))
        .timeouts(Duration::from_secs(connect), Duration::from_secs(read));

    if let Some(cookies) = args.cookies.as_ref().or(file.cookies.as_ref()) {
        config = config.cookies(cookies.clone());
    }
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        config = config.basic_auth(user.clone(), password.clone());
    }
    config
}

fn content_cache(file: &FileConfig) -> ContentCache {
    ContentCache::with_policy(CachePolicy {
        ttl: file.cache_ttl_secs.map(Duration::from_secs),
        max_entries: file.cache_max_entries,
    })
}

fn print_table(bom: &Bom) {
    println!("{}", bom.title());
    for row in bom.rows() {
        if row.part().is_abstract() {
            continue;
        }
        println!(
            "{:>6}  {}  {}  {:.2}",
            row.quantity(),
            row.part().title(),
            row.part().url(),
            row.cost()
        );
    }
    println!(
        "Total: {} parts, {} rows, cost {:.2}",
        bom.part_count(),
        bom.row_count(),
        bom.total_cost()
    );
}
