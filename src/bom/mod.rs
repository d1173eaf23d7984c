//! Bill-of-materials engine.
//!
//! A [`Bom`] starts from one root part and repeatedly resolves rows: each
//! resolved assembly is expanded into its children (quantities multiplied
//! down the tree) and then leaves the row set, until only leaf parts and
//! abstract groupings remain or the time budget runs out.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use partlist_core::bom::Bom;
//! use partlist_core::fetch::{CachingFetcher, ContentCache, FetcherConfig};
//! use partlist_core::part::build_default_part_factory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(CachingFetcher::new(FetcherConfig::from_env(), ContentCache::new())?);
//! let factory = build_default_part_factory(fetcher);
//! let bom = Bom::from_url("https://example.com/kit", &factory)?;
//! let resolved = bom.resolve(Duration::from_secs(30)).await?;
//! println!("{} parts, resolved: {resolved}", bom.part_count());
//! # Ok(())
//! # }
//! ```

mod column;
mod error;
mod row;
mod store;
#[cfg(test)]
mod stub;
mod timer;

pub use column::{BomColumn, BomColumnDescription, ColumnType};
pub use error::BomError;
pub use row::{BomRow, RowProgress, RowSnapshot};
pub use store::RowStore;
pub use timer::RefreshTimer;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, warn};

use crate::part::{Part, PartFactory, PartId, UNRESOLVED_TITLE};

/// Default number of row steps run at once within a pass.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Pause between passes that changed nothing.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A bill of materials rooted at one part.
///
/// All operations take `&self`; the row set is safe to read while a resolve
/// is running.
pub struct Bom {
    url: String,
    root_part: Arc<dyn Part>,
    title: Mutex<String>,
    rows: RowStore,
    timer: RefreshTimer,
    concurrency: usize,
}

impl Bom {
    /// Creates a BOM seeded with one of `root_part`.
    #[must_use]
    pub fn new(root_part: Arc<dyn Part>) -> Self {
        let rows = RowStore::new();
        rows.seed(Arc::clone(&root_part), 1);
        Self {
            url: root_part.url().to_string(),
            root_part,
            title: Mutex::new(UNRESOLVED_TITLE.to_string()),
            rows,
            timer: RefreshTimer::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Creates a BOM for the part at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BomError::Part`] if the factory cannot create the root part.
    pub fn from_url(url: &str, factory: &Arc<PartFactory>) -> Result<Self, BomError> {
        let root_part = factory.create_part(url)?;
        Ok(Self::new(root_part))
    }

    /// Sets how many row steps run at once within a pass (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the distinct-part limit (0 = unlimited).
    #[must_use]
    pub fn with_maximum_parts(self, maximum_parts: usize) -> Self {
        self.set_maximum_parts(maximum_parts);
        self
    }

    /// Resolves rows until every row is resolved or `timeout` elapses.
    ///
    /// Returns whether the BOM is fully resolved. A pass always runs if the
    /// BOM is unresolved, even with a zero timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BomError::LimitExceeded`] as soon as a row step would add
    /// more distinct parts than allowed; rows added before that stay.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn resolve(&self, timeout: Duration) -> Result<bool, BomError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut passes = 0_u32;

        while !self.is_resolved() {
            passes += 1;
            let progressed = self.resolve_pass(deadline).await?;
            if self.is_resolved() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    passes,
                    rows = self.row_count(),
                    timeout_ms = timeout.as_millis(),
                    "BOM resolve timed out"
                );
                break;
            }
            if !progressed {
                time::sleep(POLL_INTERVAL.min(deadline - now)).await;
            }
        }

        if self.root_part.is_resolved() {
            self.set_title(self.root_part.title());
        }

        let resolved = self.is_resolved();
        info!(
            resolved,
            passes,
            rows = self.row_count(),
            parts = self.part_count(),
            elapsed_ms = started.elapsed().as_millis(),
            "BOM resolve finished"
        );
        Ok(resolved)
    }

    /// One scan over a snapshot of the rows, then bulk removal of expanded
    /// assemblies. Returns whether anything changed.
    async fn resolve_pass(&self, deadline: Instant) -> Result<bool, BomError> {
        let store = &self.rows;
        let mut steps = stream::iter(self.rows.snapshot())
            .map(|row| async move {
                let outcome = time::timeout_at(deadline, row.resolve(store)).await;
                (row, outcome)
            })
            .buffered(self.concurrency);

        let mut progressed = false;
        let mut expanded = Vec::new();
        while let Some((row, outcome)) = steps.next().await {
            match outcome {
                Ok(Ok(progress)) => {
                    progressed |= progress.advanced;
                    if progress.removable {
                        expanded.push(row);
                    }
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => debug!(id = %row.id(), "row step cut off by resolve deadline"),
            }
        }

        let removed = self.rows.remove_all_if(&expanded, BomRow::is_settled);
        if removed > 0 {
            debug!(removed, "removed expanded assemblies");
        }
        Ok(progressed || removed > 0)
    }

    /// Refreshes every part that is no longer fresh.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn refresh(&self) {
        for row in self.rows.snapshot() {
            if !row.part().is_fresh() {
                row.part().refresh().await;
            }
        }
    }

    /// Whether every part is fresh.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.rows.snapshot().iter().all(|row| row.part().is_fresh())
    }

    /// Whether every row is resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.rows.snapshot().iter().all(|row| row.is_resolved())
    }

    /// Whether no part carries a refresh error.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rows
            .snapshot()
            .iter()
            .all(|row| row.part().refresh_error().is_none())
    }

    /// Total quantity across non-abstract rows.
    #[must_use]
    pub fn part_count(&self) -> u64 {
        self.rows
            .snapshot()
            .iter()
            .filter(|row| !row.part().is_abstract())
            .map(|row| row.quantity())
            .sum()
    }

    /// Total cost across non-abstract rows.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.rows
            .snapshot()
            .iter()
            .filter(|row| !row.part().is_abstract())
            .map(|row| row.cost())
            .sum()
    }

    /// Restarts the age timer.
    pub fn sample(&self) {
        self.timer.sample();
    }

    /// Time since construction or the last [`sample`](Self::sample).
    #[must_use]
    pub fn age(&self) -> Duration {
        self.timer.age()
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows sorted by part identity.
    #[must_use]
    pub fn rows(&self) -> Vec<Arc<BomRow>> {
        self.rows.snapshot()
    }

    /// Row at `index` in identity order.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<Arc<BomRow>> {
        self.rows.snapshot().into_iter().nth(index)
    }

    /// Row for `id`, if present.
    #[must_use]
    pub fn lookup(&self, id: &PartId) -> Option<Arc<BomRow>> {
        self.rows.lookup(id)
    }

    /// The underlying row store.
    #[must_use]
    pub fn store(&self) -> &RowStore {
        &self.rows
    }

    /// All column descriptions in display order.
    #[must_use]
    pub fn describe_columns(&self) -> Vec<BomColumnDescription> {
        BomColumn::ALL.iter().map(|column| column.describe()).collect()
    }

    /// Description of one column.
    #[must_use]
    pub fn column(&self, column: BomColumn) -> BomColumnDescription {
        column.describe()
    }

    /// BOM title; the root part's title once it resolves.
    #[must_use]
    pub fn title(&self) -> String {
        self.title
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overrides the title.
    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock().unwrap_or_else(PoisonError::into_inner) = title.into();
    }

    /// Root URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Root part identity.
    #[must_use]
    pub fn id(&self) -> &PartId {
        self.root_part.id()
    }

    /// The root part.
    #[must_use]
    pub fn root_part(&self) -> &Arc<dyn Part> {
        &self.root_part
    }

    /// Distinct-part limit; 0 means unlimited.
    #[must_use]
    pub fn maximum_parts(&self) -> usize {
        self.rows.maximum_parts()
    }

    /// Sets the distinct-part limit; 0 means unlimited.
    pub fn set_maximum_parts(&self, maximum_parts: usize) {
        self.rows.set_maximum_parts(maximum_parts);
    }

    /// Row-level concurrency within a pass.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Serializable summary of the current state.
    #[must_use]
    pub fn summary(&self) -> BomSummary {
        BomSummary {
            url: self.url.clone(),
            id: self.id().clone(),
            title: self.title(),
            resolved: self.is_resolved(),
            valid: self.is_valid(),
            row_count: self.row_count(),
            part_count: self.part_count(),
            total_cost: self.total_cost(),
            rows: self.rows().iter().map(|row| row.snapshot()).collect(),
        }
    }
}

impl fmt::Display for Bom {
    /// Column titles separated by commas.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, column) in BomColumn::ALL.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(column.title())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bom")
            .field("url", &self.url)
            .field("title", &self.title())
            .field("rows", &self.row_count())
            .field("maximum_parts", &self.maximum_parts())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Point-in-time report of a BOM.
#[derive(Debug, Clone, Serialize)]
pub struct BomSummary {
    /// Root URL.
    pub url: String,
    /// Root part identity.
    pub id: PartId,
    /// BOM title.
    pub title: String,
    /// Whether every row is resolved.
    pub resolved: bool,
    /// Whether no part carries a refresh error.
    pub valid: bool,
    /// Number of rows.
    pub row_count: usize,
    /// Total quantity across non-abstract rows.
    pub part_count: u64,
    /// Total cost across non-abstract rows.
    pub total_cost: f64,
    /// Rows in identity order.
    pub rows: Vec<RowSnapshot>,
}
