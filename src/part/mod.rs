//! Part capability contract, identity and factory.
//!
//! A [`Part`] is one node of the bill-of-materials graph. The BOM engine only
//! talks to parts through this trait; how a part learns its title, cost and
//! children from a vendor page is up to the implementation.
//!
//! # Architecture
//!
//! - [`Part`] - async trait every part type implements
//! - [`PartId`] - ordered identity derived from the canonical URL
//! - [`PartUsage`] - a child part and its per-parent quantity
//! - [`PartFactory`] - URL-pattern keyed adapter registry with a shared part cache
//! - [`PagePart`] - fallback leaf part titled from its page's `<title>`

mod error;
mod factory;
mod id;
mod page;

pub use error::PartError;
pub use factory::{AdapterPriority, PartAdapter, PartFactory, build_default_part_factory};
pub use id::{PartId, canonical_url};
pub use page::{DEFAULT_PAGE_MAX_AGE, PageAdapter, PagePart};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Title reported by a part that has not resolved yet.
pub const UNRESOLVED_TITLE: &str = "(Processing...)";

/// One edge of the part graph: `quantity` of `part` per parent.
#[derive(Debug, Clone)]
pub struct PartUsage {
    /// The child part.
    pub part: Arc<dyn Part>,
    /// How many of the child one parent needs.
    pub quantity: u64,
}

impl PartUsage {
    /// Creates a usage edge.
    #[must_use]
    pub fn new(part: Arc<dyn Part>, quantity: u64) -> Self {
        Self { part, quantity }
    }
}

/// Capability contract for a node in the BOM tree.
///
/// Implementations use interior mutability: `refresh` updates the part in
/// place and may be called from several tasks.
///
/// # Object Safety
///
/// This trait uses `async_trait` so parts can be held as `Arc<dyn Part>`.
#[async_trait]
pub trait Part: Send + Sync + fmt::Debug {
    /// Identity used for deduplication and ordering.
    fn id(&self) -> &PartId;

    /// URL the part was created from.
    fn url(&self) -> &str;

    /// Human-readable name; [`UNRESOLVED_TITLE`] until resolved.
    fn title(&self) -> String;

    /// Vendor or source label. Defaults to the URL host.
    fn source(&self) -> String {
        url::Url::parse(self.url())
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Cost of one unit.
    fn unit_cost(&self) -> f64;

    /// Grouping part that is never counted as a leaf.
    fn is_abstract(&self) -> bool {
        false
    }

    /// Whether resolving this part yields children.
    fn is_assembly(&self) -> bool;

    /// Whether the part has finished resolving.
    fn is_resolved(&self) -> bool;

    /// Whether the part's own state is still fresh.
    fn is_fresh(&self) -> bool;

    /// Failure recorded by the last refresh, if any.
    fn refresh_error(&self) -> Option<PartError>;

    /// Time since the last refresh completed.
    fn last_refresh_age(&self) -> Option<Duration>;

    /// Child parts with per-parent quantities. Empty for leaves.
    fn children(&self) -> Vec<PartUsage>;

    /// Re-reads the part's source and updates it in place.
    async fn refresh(&self);

    /// Advances resolution; returns whether the part is now resolved.
    async fn resolve(&self) -> bool {
        if !self.is_resolved() {
            self.refresh().await;
        }
        self.is_resolved()
    }
}
