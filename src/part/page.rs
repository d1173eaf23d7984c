//! Generic leaf part backed by a single web page.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use super::factory::{AdapterPriority, PartAdapter, PartFactory};
use super::{Part, PartError, PartId, PartUsage, UNRESOLVED_TITLE};
use crate::fetch::{CachingFetcher, scrape_title};

/// Default freshness window for page parts (1 hour).
pub const DEFAULT_PAGE_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Fallback adapter: any http(s) URL becomes a [`PagePart`].
#[derive(Debug, Clone, Copy)]
pub struct PageAdapter {
    max_age: Duration,
}

impl PageAdapter {
    /// Creates an adapter whose parts go stale after `max_age`.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }
}

impl Default for PageAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_MAX_AGE)
    }
}

impl PartAdapter for PageAdapter {
    fn name(&self) -> &str {
        "page"
    }

    fn priority(&self) -> AdapterPriority {
        AdapterPriority::Fallback
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    fn create(&self, id: PartId, url: Url, factory: &Arc<PartFactory>) -> Arc<dyn Part> {
        Arc::new(PagePart::new(
            id,
            url.into(),
            Arc::clone(factory.fetcher()),
            self.max_age,
        ))
    }
}

#[derive(Debug, Default)]
struct PageState {
    title: Option<String>,
    refresh_error: Option<PartError>,
    refreshed_at: Option<Instant>,
}

/// Leaf part titled from its page's `<title>` element.
///
/// A failed fetch still resolves the part: the failure is kept as the
/// refresh error and the title falls back to the URL.
#[derive(Debug)]
pub struct PagePart {
    id: PartId,
    url: String,
    fetcher: Arc<CachingFetcher>,
    max_age: Duration,
    state: Mutex<PageState>,
}

impl PagePart {
    /// Creates an unresolved page part.
    #[must_use]
    pub fn new(id: PartId, url: String, fetcher: Arc<CachingFetcher>, max_age: Duration) -> Self {
        Self {
            id,
            url,
            fetcher,
            max_age,
            state: Mutex::new(PageState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Part for PagePart {
    fn id(&self) -> &PartId {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn title(&self) -> String {
        self.state()
            .title
            .clone()
            .unwrap_or_else(|| UNRESOLVED_TITLE.to_string())
    }

    fn unit_cost(&self) -> f64 {
        0.0
    }

    fn is_assembly(&self) -> bool {
        false
    }

    fn is_resolved(&self) -> bool {
        self.state().refreshed_at.is_some()
    }

    fn is_fresh(&self) -> bool {
        self.state()
            .refreshed_at
            .is_some_and(|at| at.elapsed() < self.max_age)
    }

    fn refresh_error(&self) -> Option<PartError> {
        self.state().refresh_error.clone()
    }

    fn last_refresh_age(&self) -> Option<Duration> {
        self.state().refreshed_at.map(|at| at.elapsed())
    }

    fn children(&self) -> Vec<PartUsage> {
        Vec::new()
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn refresh(&self) {
        // A stale part must not be served the same cached page again.
        if self.is_resolved() {
            self.fetcher.cache().remove(&self.url);
        }

        let outcome = self.fetcher.get(&self.url).await;

        let mut state = self.state();
        match outcome {
            Ok(content) => {
                let title = scrape_title(&content).unwrap_or_else(|| self.url.clone());
                debug!(title = %title, "page part refreshed");
                state.title = Some(title);
                state.refresh_error = None;
            }
            Err(err) => {
                warn!(error = %err, "page part refresh failed");
                state.title = Some(self.url.clone());
                state.refresh_error = Some(PartError::Fetch(err));
            }
        }
        state.refreshed_at = Some(Instant::now());
    }
}
