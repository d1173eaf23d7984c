//! Partlist Core Library
//!
//! This library builds flattened bills of materials from web-hosted part
//! pages: starting at one root URL it resolves assemblies into their
//! sub-parts, merges repeated parts into one row each and totals quantity
//! and cost.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`bom`] - Row store and the bounded resolve loop
//! - [`part`] - Part contract, identity and the adapter factory
//! - [`fetch`] - Cache-first HTTP fetching and text scraping

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bom;
pub mod fetch;
pub mod part;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use bom::{Bom, BomColumn, BomError, BomRow, BomSummary, RowStore};
pub use fetch::{CachingFetcher, ContentCache, FetchError, FetcherConfig, scrape_text};
pub use part::{Part, PartError, PartFactory, PartId, PartUsage, build_default_part_factory};
