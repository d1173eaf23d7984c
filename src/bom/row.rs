//! One deduplicated BOM ledger entry.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, trace};

use super::{BomColumn, BomError, RowStore};
use crate::part::{Part, PartId, PartUsage};

/// What one resolve step did to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowProgress {
    /// The part became resolved or new quantity was expanded into children.
    pub advanced: bool,
    /// The row is a resolved, non-abstract assembly and may leave the store
    /// once all of its quantity is expanded.
    pub removable: bool,
}

/// A part plus the quantity the BOM needs of it.
///
/// Rows compare by part identity only. Quantity only grows; `expanded`
/// records how much of it was already folded into child rows, so a merge
/// that lands after expansion is expanded on the next step instead of lost.
/// Child merges refused by the part limit wait in `deferred` and are retried
/// before any new quantity is claimed.
pub struct BomRow {
    part: Arc<dyn Part>,
    quantity: AtomicU64,
    expanded: AtomicU64,
    deferred: Mutex<Vec<PartUsage>>,
}

impl BomRow {
    /// Creates a row for `part` with an initial quantity.
    #[must_use]
    pub fn new(part: Arc<dyn Part>, quantity: u64) -> Self {
        Self {
            part,
            quantity: AtomicU64::new(quantity),
            expanded: AtomicU64::new(0),
            deferred: Mutex::new(Vec::new()),
        }
    }

    /// The row's part.
    #[must_use]
    pub fn part(&self) -> &Arc<dyn Part> {
        &self.part
    }

    /// The part identity.
    #[must_use]
    pub fn id(&self) -> &PartId {
        self.part.id()
    }

    /// Accumulated quantity.
    #[must_use]
    pub fn quantity(&self) -> u64 {
        self.quantity.load(Ordering::Acquire)
    }

    /// Adds `quantity`; returns the new total.
    pub fn add_quantity(&self, quantity: u64) -> u64 {
        self.quantity.fetch_add(quantity, Ordering::AcqRel) + quantity
    }

    /// Quantity already folded into child rows.
    #[must_use]
    pub fn expanded_quantity(&self) -> u64 {
        self.expanded.load(Ordering::Acquire)
    }

    /// Quantity not yet expanded into child rows.
    #[must_use]
    pub fn pending_quantity(&self) -> u64 {
        self.quantity().saturating_sub(self.expanded_quantity())
    }

    /// Number of child merges claimed but not yet applied.
    #[must_use]
    pub fn deferred_merges(&self) -> usize {
        self.lock_deferred().len()
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Vec<PartUsage>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fully_expanded(&self) -> bool {
        self.pending_quantity() == 0 && self.lock_deferred().is_empty()
    }

    /// `unit_cost * quantity`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self) -> f64 {
        self.part.unit_cost() * self.quantity() as f64
    }

    /// Part resolved and, for assemblies, every unit expanded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.part.is_resolved() && (!self.part.is_assembly() || self.is_fully_expanded())
    }

    /// Resolved non-abstract assembly with nothing left to expand.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.part.is_abstract()
            && self.part.is_assembly()
            && self.part.is_resolved()
            && self.is_fully_expanded()
    }

    /// Claims the unexpanded quantity. Concurrent callers never claim the
    /// same units twice.
    fn take_unexpanded(&self) -> u64 {
        let mut expanded = self.expanded.load(Ordering::Acquire);
        loop {
            let quantity = self.quantity();
            if quantity <= expanded {
                return 0;
            }
            match self.expanded.compare_exchange(
                expanded,
                quantity,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return quantity - expanded,
                Err(current) => expanded = current,
            }
        }
    }

    /// Runs one resolution step for this row.
    ///
    /// Resolves the part if needed. For a resolved assembly, each child is
    /// merged into `store` with `edge quantity * newly expanded quantity`.
    /// Merges refused by the limit stay on the row and are retried first on
    /// the next step, so raising the limit and resolving again loses nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BomError::LimitExceeded`] if a new child row would exceed
    /// the store's maximum.
    pub async fn resolve(&self, store: &RowStore) -> Result<RowProgress, BomError> {
        let was_resolved = self.part.is_resolved();
        let resolved = was_resolved || self.part.resolve().await;
        if !resolved {
            trace!(id = %self.id(), "part not resolved yet");
            return Ok(RowProgress::default());
        }

        // No await below this point: a cancelled step never holds claimed work.
        let mut advanced = !was_resolved;
        if self.part.is_assembly() {
            let mut merges = std::mem::take(&mut *self.lock_deferred());
            let delta = self.take_unexpanded();
            if delta > 0 {
                let children = self.part.children();
                debug!(
                    id = %self.id(),
                    quantity = delta,
                    children = children.len(),
                    "expanding assembly"
                );
                merges.extend(
                    children
                        .into_iter()
                        .filter(|usage| usage.quantity > 0)
                        .map(|usage| {
                            PartUsage::new(usage.part, usage.quantity.saturating_mul(delta))
                        }),
                );
            }
            advanced |= !merges.is_empty();
            self.merge_children(store, merges)?;
        }

        Ok(RowProgress {
            advanced,
            removable: self.part.is_assembly() && !self.part.is_abstract(),
        })
    }

    fn merge_children(&self, store: &RowStore, merges: Vec<PartUsage>) -> Result<(), BomError> {
        let mut merges = merges.into_iter();
        while let Some(usage) = merges.next() {
            if let Err(err) = store.add_or_merge(Arc::clone(&usage.part), usage.quantity) {
                let mut deferred = self.lock_deferred();
                deferred.push(usage);
                deferred.extend(merges);
                debug!(
                    id = %self.id(),
                    deferred = deferred.len(),
                    "child merges deferred by part limit"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Display text for one column.
    #[must_use]
    pub fn cell(&self, column: BomColumn) -> String {
        match column {
            BomColumn::Id => self.id().to_string(),
            BomColumn::Quantity => self.quantity().to_string(),
            BomColumn::Source => self.part.source(),
            BomColumn::Cost => format!("{:.2}", self.cost()),
            BomColumn::UnitCost => format!("{:.2}", self.part.unit_cost()),
            BomColumn::Title => self.part.title(),
            BomColumn::Url => self.part.url().to_string(),
        }
    }

    /// Point-in-time copy of the row for reporting.
    #[must_use]
    pub fn snapshot(&self) -> RowSnapshot {
        RowSnapshot {
            id: self.id().clone(),
            title: self.part.title(),
            url: self.part.url().to_string(),
            source: self.part.source(),
            quantity: self.quantity(),
            unit_cost: self.part.unit_cost(),
            cost: self.cost(),
            is_abstract: self.part.is_abstract(),
            resolved: self.is_resolved(),
            error: self.part.refresh_error().map(|err| err.to_string()),
        }
    }
}

impl fmt::Debug for BomRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BomRow")
            .field("id", self.id())
            .field("quantity", &self.quantity())
            .field("expanded", &self.expanded_quantity())
            .field("deferred", &self.deferred_merges())
            .finish_non_exhaustive()
    }
}

impl PartialEq for BomRow {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for BomRow {}

impl PartialOrd for BomRow {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for BomRow {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.id().cmp(other.id())
    }
}

/// Serializable copy of a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    /// Part identity.
    pub id: PartId,
    /// Part title.
    pub title: String,
    /// Part URL.
    pub url: String,
    /// Vendor or source label.
    pub source: String,
    /// Accumulated quantity.
    pub quantity: u64,
    /// Cost of one unit.
    pub unit_cost: f64,
    /// `unit_cost * quantity`.
    pub cost: f64,
    /// Whether the part is abstract.
    pub is_abstract: bool,
    /// Whether the row is resolved.
    pub resolved: bool,
    /// Last refresh failure of the part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
