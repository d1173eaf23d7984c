//! Integration tests for the BOM engine.
//!
//! Drives `Bom` and `RowStore` through the public API with scripted parts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use partlist_core::bom::{Bom, BomError, RowStore};
use partlist_core::part::Part;

mod support;
use support::parts::{Behavior, MockPart, dyn_part};

#[test]
fn test_row_store_dedup_sums_quantity() {
    let store = RowStore::new();
    let bolt = MockPart::leaf("https://vendor.test/bolt").build();

    store.add_or_merge(dyn_part(&bolt), 2).unwrap();
    store.add_or_merge(dyn_part(&bolt), 5).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup(bolt.id()).unwrap().quantity(), 7);
}

#[test]
fn test_row_store_iterates_in_identity_order() {
    let store = RowStore::new();
    for url in [
        "https://vendor.test/z",
        "https://vendor.test/a",
        "https://other.test/m",
        "https://vendor.test/k",
    ] {
        store
            .add_or_merge(dyn_part(&MockPart::leaf(url).build()), 1)
            .unwrap();
    }

    let ids: Vec<String> = store.snapshot().iter().map(|row| row.id().to_string()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids[0], "https://other.test/m");
}

#[test]
fn test_row_store_limit_keeps_count_at_maximum() {
    let store = RowStore::with_maximum_parts(3);
    for index in 0..3 {
        store
            .add_or_merge(
                dyn_part(&MockPart::leaf(&format!("https://vendor.test/{index}")).build()),
                1,
            )
            .unwrap();
    }

    let err = store
        .add_or_merge(dyn_part(&MockPart::leaf("https://vendor.test/extra").build()), 1)
        .unwrap_err();
    assert!(matches!(err, BomError::LimitExceeded { maximum: 3 }));
    assert_eq!(store.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_or_merge_produces_one_row() {
    let store = Arc::new(RowStore::new());
    let washer = MockPart::leaf("https://vendor.test/washer").build();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let washer = Arc::clone(&washer);
            tokio::spawn(async move {
                for _ in 0..250 {
                    store.add_or_merge(dyn_part(&washer), 2).unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup(washer.id()).unwrap().quantity(), 8 * 250 * 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_adds_respect_limit() {
    let store = Arc::new(RowStore::with_maximum_parts(10));

    let tasks: Vec<_> = (0..40)
        .map(|index| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let part = MockPart::leaf(&format!("https://vendor.test/p{index}")).build();
                store.add_or_merge(dyn_part(&part), 1).is_ok()
            })
        })
        .collect();
    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(store.len(), 10);
}

#[tokio::test]
async fn test_end_to_end_quantities_multiply_down_the_tree() {
    let screw = MockPart::leaf("https://vendor.test/screw").cost(0.1).build();
    let left = MockPart::assembly("https://vendor.test/left")
        .with_child(&screw, 3)
        .build();
    let right = MockPart::assembly("https://vendor.test/right")
        .with_child(&screw, 3)
        .build();
    let root = MockPart::assembly("https://vendor.test/frame")
        .titled("Frame Kit")
        .with_child(&left, 1)
        .with_child(&right, 1)
        .build();

    let bom = Bom::new(dyn_part(&root));
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());

    assert_eq!(bom.row_count(), 1);
    let row = bom.item(0).unwrap();
    assert_eq!(row.id().as_str(), "https://vendor.test/screw");
    assert_eq!(row.quantity(), 6);
    assert_eq!(bom.part_count(), 6);
    assert!((bom.total_cost() - 0.6).abs() < 1e-9);
    assert_eq!(bom.title(), "Frame Kit");
    assert!(bom.is_valid());
}

#[tokio::test]
async fn test_nested_quantities_compound() {
    let pin = MockPart::leaf("https://vendor.test/pin").build();
    let hinge = MockPart::assembly("https://vendor.test/hinge")
        .with_child(&pin, 2)
        .build();
    let door = MockPart::assembly("https://vendor.test/door")
        .with_child(&hinge, 3)
        .build();
    let cabinet = MockPart::assembly("https://vendor.test/cabinet")
        .with_child(&door, 2)
        .build();

    let bom = Bom::new(dyn_part(&cabinet));
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());
    assert_eq!(bom.part_count(), 12);
}

#[tokio::test]
async fn test_converges_with_parts_that_need_several_attempts() {
    let nut = MockPart::leaf("https://vendor.test/nut")
        .behavior(Behavior::AfterAttempts(3))
        .build();
    let root = MockPart::assembly("https://vendor.test/kit")
        .behavior(Behavior::AfterAttempts(2))
        .with_child(&nut, 4)
        .build();

    let bom = Bom::new(dyn_part(&root));
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());
    assert!(bom.is_resolved());
    assert_eq!(bom.part_count(), 4);
    assert_eq!(nut.attempts(), 3);
}

#[tokio::test]
async fn test_timeout_keeps_resolved_rows_and_unresolved_row() {
    let good = MockPart::leaf("https://vendor.test/good").build();
    let stuck = MockPart::leaf("https://vendor.test/stuck")
        .behavior(Behavior::Never)
        .build();
    let root = MockPart::assembly("https://vendor.test/kit")
        .with_child(&good, 1)
        .with_child(&stuck, 2)
        .build();

    let bom = Bom::new(dyn_part(&root));
    let started = Instant::now();
    let resolved = bom.resolve(Duration::from_millis(200)).await.unwrap();
    let elapsed = started.elapsed();

    assert!(!resolved);
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(bom.row_count(), 2);
    assert!(bom.lookup(good.id()).unwrap().is_resolved());
    assert!(!bom.lookup(stuck.id()).unwrap().is_resolved());
    assert!(!bom.is_resolved());
}

#[tokio::test]
async fn test_hanging_part_is_cut_off_at_deadline() {
    let root = MockPart::leaf("https://vendor.test/slow")
        .behavior(Behavior::Hang)
        .build();
    let bom = Bom::new(dyn_part(&root));

    let started = Instant::now();
    let resolved = bom.resolve(Duration::from_millis(150)).await.unwrap();

    assert!(!resolved);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(bom.row_count(), 1);
}

#[tokio::test]
async fn test_limit_exceeded_is_fatal() {
    let root = MockPart::assembly("https://vendor.test/kit").build();
    for index in 0..5 {
        let leaf = MockPart::leaf(&format!("https://vendor.test/leaf{index}")).build();
        root.add_child(&leaf, 1);
    }

    let bom = Bom::new(dyn_part(&root)).with_maximum_parts(3);
    let err = bom.resolve(Duration::from_secs(5)).await.unwrap_err();

    assert_eq!(err, BomError::LimitExceeded { maximum: 3 });
    assert_eq!(bom.row_count(), 3);
    assert!(!bom.is_resolved());
}

#[tokio::test]
async fn test_raising_limit_after_refusal_recovers_every_child() {
    let leaves: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| MockPart::leaf(&format!("https://vendor.test/{name}")).build())
        .collect();
    let root = MockPart::assembly("https://vendor.test/kit").build();
    for leaf in &leaves {
        root.add_child(leaf, 1);
    }

    let bom = Bom::new(dyn_part(&root)).with_maximum_parts(2);
    let err = bom.resolve(Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err, BomError::LimitExceeded { maximum: 2 });
    assert_eq!(bom.row_count(), 2);
    assert!(!bom.is_resolved());

    bom.set_maximum_parts(0);
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());

    assert_eq!(bom.part_count(), 3);
    assert_eq!(bom.row_count(), 3);
    for leaf in &leaves {
        assert_eq!(bom.lookup(leaf.id()).unwrap().quantity(), 1);
    }
}

#[tokio::test]
async fn test_unlimited_when_maximum_is_zero() {
    let root = MockPart::assembly("https://vendor.test/kit").build();
    for index in 0..50 {
        root.add_child(
            &MockPart::leaf(&format!("https://vendor.test/leaf{index}")).build(),
            1,
        );
    }

    let bom = Bom::new(dyn_part(&root)).with_maximum_parts(0);
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());
    assert_eq!(bom.row_count(), 50);
}

#[tokio::test]
async fn test_concurrent_passes_match_sequential_result() {
    let build = || {
        let bolt = MockPart::leaf("https://vendor.test/bolt").cost(0.25).build();
        let nut = MockPart::leaf("https://vendor.test/nut").cost(0.05).build();
        let root = MockPart::assembly("https://vendor.test/kit").build();
        for index in 0..6 {
            let sub = MockPart::assembly(&format!("https://vendor.test/sub{index}"))
                .with_child(&bolt, 2)
                .with_child(&nut, 4)
                .build();
            root.add_child(&sub, 1);
        }
        root
    };

    let sequential = Bom::new(dyn_part(&build()));
    let parallel = Bom::new(dyn_part(&build())).with_concurrency(8);
    assert!(sequential.resolve(Duration::from_secs(5)).await.unwrap());
    assert!(parallel.resolve(Duration::from_secs(5)).await.unwrap());

    assert_eq!(sequential.part_count(), 36);
    assert_eq!(parallel.part_count(), sequential.part_count());
    assert!((parallel.total_cost() - sequential.total_cost()).abs() < 1e-9);
    assert_eq!(parallel.row_count(), 2);
}

#[tokio::test]
async fn test_abstract_grouping_stays_but_is_not_counted() {
    let cable = MockPart::leaf("https://vendor.test/cable").cost(2.0).build();
    let group = MockPart::assembly("https://vendor.test/wiring")
        .abstract_part()
        .cost(50.0)
        .with_child(&cable, 3)
        .build();
    let root = MockPart::assembly("https://vendor.test/kit")
        .with_child(&group, 1)
        .build();

    let bom = Bom::new(dyn_part(&root));
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());

    assert_eq!(bom.row_count(), 2);
    assert_eq!(bom.part_count(), 3);
    assert!((bom.total_cost() - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_refresh_error_marks_bom_invalid_without_stopping() {
    let broken = MockPart::leaf("https://vendor.test/broken")
        .failing("page layout changed")
        .build();
    let fine = MockPart::leaf("https://vendor.test/fine").build();
    let root = MockPart::assembly("https://vendor.test/kit")
        .with_child(&broken, 1)
        .with_child(&fine, 1)
        .build();

    let bom = Bom::new(dyn_part(&root));
    assert!(bom.resolve(Duration::from_secs(5)).await.unwrap());
    assert!(!bom.is_valid());
    assert_eq!(bom.row_count(), 2);

    let summary = bom.summary();
    assert!(!summary.valid);
    assert!(summary.rows.iter().any(|row| row.error.is_some()));
}

#[tokio::test]
async fn test_title_stays_placeholder_when_root_unresolved() {
    let root = MockPart::assembly("https://vendor.test/kit")
        .behavior(Behavior::Never)
        .build();
    let bom = Bom::new(dyn_part(&root));
    assert!(!bom.resolve(Duration::from_millis(50)).await.unwrap());
    assert_eq!(bom.title(), partlist_core::part::UNRESOLVED_TITLE);
}
