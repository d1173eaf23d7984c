//! In-process URL content cache with negative entries.
//!
//! Entries are keyed by the URL as requested (before any redirect). A cached
//! failure is returned to later callers exactly as it was first observed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::error::FetchError;

/// Outcome stored for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedOutcome {
    /// Page text from a successful fetch.
    Content(String),
    /// Failure recorded by a previous fetch.
    Failure(FetchError),
}

impl CachedOutcome {
    /// Converts the cached outcome back into the result the fetch produced.
    ///
    /// # Errors
    ///
    /// Returns the recorded [`FetchError`] for a negative entry.
    pub fn into_result(self) -> Result<String, FetchError> {
        match self {
            Self::Content(text) => Ok(text),
            Self::Failure(error) => Err(error),
        }
    }
}

/// Expiry and size policy for a [`ContentCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are treated as absent. `None` never expires.
    pub ttl: Option<Duration>,
    /// Upper bound on stored entries. `None` is unbounded.
    pub max_entries: Option<usize>,
}

#[derive(Debug)]
struct CacheEntry {
    outcome: CachedOutcome,
    stored_at: Instant,
}

/// Concurrent key-value cache of fetch outcomes.
///
/// Cloning is cheap and clones share storage, so one cache can back any
/// number of fetchers.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    policy: CachePolicy,
}

impl ContentCache {
    /// Creates an unbounded cache whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given expiry and size policy.
    #[must_use]
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            policy,
        }
    }

    /// Returns the policy this cache was built with.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the live outcome stored for `key`, dropping it if expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedOutcome> {
        {
            let entry = self.entries.get(key)?;
            if !self.is_expired(&entry) {
                return Some(entry.outcome.clone());
            }
        }
        trace!(key, "content cache entry expired");
        self.entries
            .remove_if(key, |_, entry| self.is_expired(entry));
        None
    }

    /// Returns whether a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !self.is_expired(&entry))
    }

    /// Stores an outcome, evicting the oldest entry first when at capacity.
    pub fn put(&self, key: impl Into<String>, outcome: CachedOutcome) {
        let key = key.into();
        if let Some(max_entries) = self.policy.max_entries
            && !self.entries.contains_key(&key)
        {
            while self.entries.len() >= max_entries && self.evict_oldest() {}
            if max_entries == 0 {
                return;
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                outcome,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes the entry for `key`, returning its outcome.
    pub fn remove(&self, key: &str) -> Option<CachedOutcome> {
        self.entries.remove(key).map(|(_, entry)| entry.outcome)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including any not yet found to be expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.policy
            .ttl
            .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| entry.key().clone());
        match oldest {
            Some(key) => {
                debug!(key = %key, "evicting oldest content cache entry");
                self.entries.remove(&key).is_some()
            }
            None => false,
        }
    }
}
