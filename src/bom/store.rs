//! Concurrent, deduplicated row set ordered by part identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{BomError, BomRow};
use crate::part::{Part, PartId};

/// Row set keyed by part identity.
///
/// Insert-or-merge is one step under the map's shard lock, and new rows
/// reserve a slot against `maximum_parts` with a compare-and-swap, so
/// concurrent adders can neither duplicate a row nor overshoot the limit.
#[derive(Debug, Default)]
pub struct RowStore {
    rows: DashMap<PartId, Arc<BomRow>>,
    row_count: AtomicUsize,
    maximum_parts: AtomicUsize,
}

impl RowStore {
    /// Creates an empty, unlimited store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store limited to `maximum_parts` distinct parts
    /// (0 = unlimited).
    #[must_use]
    pub fn with_maximum_parts(maximum_parts: usize) -> Self {
        let store = Self::new();
        store.set_maximum_parts(maximum_parts);
        store
    }

    /// Distinct-part limit; 0 means unlimited.
    #[must_use]
    pub fn maximum_parts(&self) -> usize {
        self.maximum_parts.load(Ordering::Acquire)
    }

    /// Sets the distinct-part limit. Existing rows are kept even if they
    /// already exceed it; only new rows are refused.
    pub fn set_maximum_parts(&self, maximum_parts: usize) {
        self.maximum_parts.store(maximum_parts, Ordering::Release);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-match lookup by identity.
    #[must_use]
    pub fn lookup(&self, id: &PartId) -> Option<Arc<BomRow>> {
        self.rows.get(id).map(|row| Arc::clone(row.value()))
    }

    /// Adds `quantity` to the row for `part`, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BomError::LimitExceeded`] when a new row would exceed
    /// `maximum_parts`. Merges into existing rows never fail.
    pub fn add_or_merge(&self, part: Arc<dyn Part>, quantity: u64) -> Result<Arc<BomRow>, BomError> {
        match self.rows.entry(part.id().clone()) {
            Entry::Occupied(entry) => {
                let total = entry.get().add_quantity(quantity);
                debug!(id = %entry.key(), added = quantity, total, "merged part quantity");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                self.reserve_slot()?;
                debug!(id = %entry.key(), quantity, "added part");
                let row = Arc::new(BomRow::new(part, quantity));
                entry.insert(Arc::clone(&row));
                Ok(row)
            }
        }
    }

    /// Inserts or merges without checking the limit. Used for the root row.
    pub fn seed(&self, part: Arc<dyn Part>, quantity: u64) -> Arc<BomRow> {
        match self.rows.entry(part.id().clone()) {
            Entry::Occupied(entry) => {
                entry.get().add_quantity(quantity);
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                self.row_count.fetch_add(1, Ordering::AcqRel);
                let row = Arc::new(BomRow::new(part, quantity));
                entry.insert(Arc::clone(&row));
                row
            }
        }
    }

    fn reserve_slot(&self) -> Result<(), BomError> {
        let maximum = self.maximum_parts();
        self.row_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (maximum == 0 || count < maximum).then_some(count + 1)
            })
            .map(|_| ())
            .map_err(|_| BomError::limit_exceeded(maximum))
    }

    /// Removes each of `rows` that is still the stored instance for its id.
    ///
    /// Returns the number of rows removed.
    pub fn remove_all(&self, rows: &[Arc<BomRow>]) -> usize {
        self.remove_all_if(rows, |_| true)
    }

    /// Like [`remove_all`](Self::remove_all), but only removes rows for
    /// which `keep_removing` holds at removal time. The predicate runs under
    /// the shard lock, so no merge can land between the check and the removal.
    pub fn remove_all_if(&self, rows: &[Arc<BomRow>], keep_removing: impl Fn(&BomRow) -> bool) -> usize {
        let mut removed = 0;
        for row in rows {
            let gone = self
                .rows
                .remove_if(row.id(), |_, current| {
                    Arc::ptr_eq(current, row) && keep_removing(current.as_ref())
                })
                .is_some();
            if gone {
                self.row_count.fetch_sub(1, Ordering::AcqRel);
                removed += 1;
            }
        }
        removed
    }

    /// Rows sorted by identity at the time of the call.
    ///
    /// Rows added while the caller walks the result are not included but
    /// stay in the store.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<BomRow>> {
        let mut rows: Vec<Arc<BomRow>> = self
            .rows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bom::stub::StubPart;

    #[test]
    fn test_add_same_identity_merges() {
        let store = RowStore::new();
        let part = StubPart::leaf("https://v.test/a").build();
        let first = store.add_or_merge(Arc::clone(&part), 2).unwrap();
        let second = store.add_or_merge(part, 3).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert_eq!(first.quantity(), 5);
    }

    #[test]
    fn test_snapshot_sorted_by_identity() {
        let store = RowStore::new();
        for url in ["https://v.test/c", "https://v.test/a", "https://v.test/b"] {
            store.add_or_merge(StubPart::leaf(url).build(), 1).unwrap();
        }
        let ids: Vec<String> = store.snapshot().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, ["https://v.test/a", "https://v.test/b", "https://v.test/c"]);
    }

    #[test]
    fn test_limit_refuses_new_rows_but_allows_merges() {
        let store = RowStore::with_maximum_parts(2);
        let a = StubPart::leaf("https://v.test/a").build();
        store.add_or_merge(Arc::clone(&a), 1).unwrap();
        store.add_or_merge(StubPart::leaf("https://v.test/b").build(), 1).unwrap();

        let err = store
            .add_or_merge(StubPart::leaf("https://v.test/c").build(), 1)
            .unwrap_err();
        assert_eq!(err, BomError::limit_exceeded(2));
        assert_eq!(store.len(), 2);

        store.add_or_merge(a, 4).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_removal_frees_a_slot() {
        let store = RowStore::with_maximum_parts(1);
        let row = store.add_or_merge(StubPart::leaf("https://v.test/a").build(), 1).unwrap();
        assert_eq!(store.remove_all(&[row]), 1);
        assert!(store.is_empty());
        store.add_or_merge(StubPart::leaf("https://v.test/b").build(), 1).unwrap();
    }

    #[test]
    fn test_remove_all_skips_replaced_instances() {
        let store = RowStore::new();
        let part = StubPart::leaf("https://v.test/a").build();
        let stale = store.add_or_merge(Arc::clone(&part), 1).unwrap();
        store.remove_all(&[Arc::clone(&stale)]);
        let fresh = store.add_or_merge(part, 1).unwrap();

        assert_eq!(store.remove_all(&[stale]), 0);
        assert!(Arc::ptr_eq(&store.lookup(fresh.id()).unwrap(), &fresh));
    }

    #[test]
    fn test_remove_all_if_checks_predicate() {
        let store = RowStore::new();
        let row = store.add_or_merge(StubPart::leaf("https://v.test/a").build(), 1).unwrap();
        assert_eq!(store.remove_all_if(&[Arc::clone(&row)], |r| r.quantity() > 1), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_seed_ignores_limit() {
        let store = RowStore::with_maximum_parts(1);
        store.seed(StubPart::leaf("https://v.test/a").build(), 1);
        store.seed(StubPart::leaf("https://v.test/b").build(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.add_or_merge(StubPart::leaf("https://v.test/c").build(), 1).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_sum_into_one_row() {
        let store = Arc::new(RowStore::new());
        let part = StubPart::leaf("https://v.test/a").build();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let part = Arc::clone(&part);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.add_or_merge(Arc::clone(&part), 1).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(part.id()).unwrap().quantity(), 1600);
    }
}
