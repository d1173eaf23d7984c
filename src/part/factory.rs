//! Adapter registry that turns URLs into shared part instances.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, instrument};
use url::Url;

use super::page::PageAdapter;
use super::{Part, PartError, PartId, canonical_url};
use crate::fetch::CachingFetcher;

/// Part cache size that triggers the first sweep of dropped parts.
const MIN_PRUNE_AT: usize = 64;

/// Priority level for adapter ordering.
///
/// Derives `Ord` so that `Specialized < General < Fallback`; the smallest
/// priority that can handle a URL wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdapterPriority {
    /// Vendor-specific adapters.
    Specialized = 0,
    /// Adapters for a family of sites or formats.
    General = 1,
    /// Catch-all adapters.
    Fallback = 2,
}

/// Builds parts for the URLs it recognises.
pub trait PartAdapter: Send + Sync {
    /// Adapter name for logging.
    fn name(&self) -> &str;

    /// Priority relative to other adapters.
    fn priority(&self) -> AdapterPriority;

    /// Returns true if this adapter builds parts for `url`.
    fn can_handle(&self, url: &Url) -> bool;

    /// Creates an unresolved part. Must not call back into `factory` synchronously.
    fn create(&self, id: PartId, url: Url, factory: &Arc<PartFactory>) -> Arc<dyn Part>;
}

/// Creates parts from URLs through registered adapters.
///
/// Parts are cached by identity for as long as anything else holds them, so
/// every path to the same canonical URL shares one instance and one
/// resolution.
pub struct PartFactory {
    adapters: Vec<Box<dyn PartAdapter>>,
    parts: DashMap<PartId, Weak<dyn Part>>,
    prune_at: AtomicUsize,
    fetcher: Arc<CachingFetcher>,
}

impl PartFactory {
    /// Creates a factory with no adapters.
    #[must_use]
    pub fn new(fetcher: Arc<CachingFetcher>) -> Self {
        Self {
            adapters: Vec::new(),
            parts: DashMap::new(),
            prune_at: AtomicUsize::new(MIN_PRUNE_AT),
            fetcher,
        }
    }

    /// Registers an adapter.
    #[instrument(skip(self, adapter), fields(adapter_name))]
    pub fn register(&mut self, adapter: Box<dyn PartAdapter>) {
        tracing::Span::current().record("adapter_name", adapter.name());
        debug!(priority = ?adapter.priority(), "registering part adapter");
        self.adapters.push(adapter);
        self.adapters.sort_by_key(|adapter| adapter.priority());
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Number of cached part handles, including ones not yet swept.
    #[must_use]
    pub fn cached_parts(&self) -> usize {
        self.parts.len()
    }

    /// Fetcher shared by the parts this factory creates.
    #[must_use]
    pub fn fetcher(&self) -> &Arc<CachingFetcher> {
        &self.fetcher
    }

    /// Returns the part for `url`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PartError::InvalidUrl`] for unparseable URLs and
    /// [`PartError::NoAdapter`] when no adapter handles the URL.
    #[instrument(skip(self))]
    pub fn create_part(self: &Arc<Self>, url: &str) -> Result<Arc<dyn Part>, PartError> {
        let canonical = canonical_url(url)?;
        let id = PartId::from_url(canonical.as_str())?;

        match self.parts.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                if let Some(part) = entry.get().upgrade() {
                    return Ok(part);
                }
                let part = self.build(id, canonical)?;
                entry.insert(Arc::downgrade(&part));
                Ok(part)
            }
            Entry::Vacant(entry) => {
                let part = self.build(id, canonical)?;
                entry.insert(Arc::downgrade(&part));
                self.prune_if_due();
                Ok(part)
            }
        }
    }

    /// Drops handles to parts nobody holds anymore once the cache has doubled
    /// since the last sweep.
    fn prune_if_due(&self) {
        let len = self.parts.len();
        if len < self.prune_at.load(Ordering::Acquire) {
            return;
        }
        self.parts.retain(|_, part| part.strong_count() > 0);
        let kept = self.parts.len();
        self.prune_at
            .store(MIN_PRUNE_AT.max(kept.saturating_mul(2)), Ordering::Release);
        debug!(before = len, kept, "pruned dropped parts from cache");
    }

    fn build(self: &Arc<Self>, id: PartId, url: Url) -> Result<Arc<dyn Part>, PartError> {
        let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.can_handle(&url))
            .ok_or_else(|| PartError::no_adapter(url.as_str()))?;
        debug!(adapter = adapter.name(), id = %id, "creating part");
        Ok(adapter.create(id, url, self))
    }
}

impl fmt::Debug for PartFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("PartFactory")
            .field("adapters", &names)
            .field("cached_parts", &self.parts.len())
            .finish_non_exhaustive()
    }
}

/// Builds the default factory: the generic page adapter as fallback.
#[must_use]
pub fn build_default_part_factory(fetcher: Arc<CachingFetcher>) -> Arc<PartFactory> {
    let mut factory = PartFactory::new(fetcher);
    factory.register(Box::new(PageAdapter::default()));
    Arc::new(factory)
}
