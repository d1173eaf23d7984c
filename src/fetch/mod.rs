//! Cache-first page fetching and text scraping.
//!
//! # Overview
//!
//! - [`CachingFetcher`] - HTTP GET with redirect following, request counters
//!   and negative caching
//! - [`ContentCache`] - shared key-value store of page text and failures
//! - [`FetcherConfig`] - header profile, caching and TLS options
//! - [`scrape_text`] - delimited substring extraction
//!
//! # Example
//!
//! ```no_run
//! use partlist_core::fetch::{CachingFetcher, ContentCache, FetcherConfig, scrape_title};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = CachingFetcher::new(FetcherConfig::from_env(), ContentCache::new())?;
//! let page = fetcher.get("https://example.com/").await?;
//! println!("{:?}", scrape_title(&page));
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod config;
mod error;
mod scrape;

pub use cache::{CachePolicy, CachedOutcome, ContentCache};
pub use client::CachingFetcher;
pub use config::{BasicAuth, CONNECT_TIMEOUT_SECS, FetcherConfig, MAX_REDIRECTS, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use scrape::{scrape_text, scrape_title};
