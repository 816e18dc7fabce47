//! A five-step pipeline crossing an inbound edge finds exactly one path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::e2e_tests::helpers::*;
use crate::query::{steps, walk};
use crate::testing::SAMPLE_EDGES;
use crate::types::Triple;

#[tokio::test]
async fn test_pipeline_list_form() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);

    let pipeline = vec![
        steps::out("p1"),
        steps::out("p2"),
        steps::inbound("p4"),
        steps::out("p1"),
        steps::has(|t| t.o == b"i"),
    ];
    let paths = walk(&store.graph, "a", pipeline).collect().await;

    assert_eq!(paths.len(), 1);
    let path = &paths[0];
    assert_eq!(path.len(), 4);
    assert_eq!(path[0], Triple::from_strs(&["a", "p1", "b"]));
    assert_eq!(path[1], Triple::from_strs(&["b", "p2", "c"]));
    assert_eq!(path[2], Triple::from_strs(&["c", "p4", "g"]));
    assert_eq!(path[3], Triple::from_strs(&["g", "p1", "i"]));
}

#[tokio::test]
async fn test_pipeline_builder_form() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let advanced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&advanced);

    let paths = steps::out("p1")
        .out("p2")
        .inbound("p4")
        .out("p1")
        .inspect(move |path| {
            assert_eq!(path.len(), 4);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .has(|t| t.o == b"i")
        .walk(&store.graph, "a")
        .collect()
        .await;

    assert_eq!(objects(&paths, 3), ["i"]);
    // Both g -p1-> h and g -p1-> i advance the fourth step.
    assert_eq!(advanced.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dead_end_branch_yields_nothing() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let paths = steps::out("p1")
        .out("p2")
        .out("p2")
        .walk(&store.graph, "a")
        .collect()
        .await;
    assert!(paths.is_empty());
}
