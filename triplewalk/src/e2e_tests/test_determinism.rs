//! Identical walks over the same store produce identical path sequences.

use crate::e2e_tests::helpers::*;
use crate::query::{Path, steps, walk};
use crate::storage::EngineOptions;
use crate::testing::SAMPLE_EDGES;

async fn run(store: &TestStore) -> Vec<Vec<Path>> {
    let mut runs = Vec::new();
    for vertex in ["a", "b", "c", "g"] {
        runs.push(
            walk(&store.graph, vertex, vec![steps::all_out(), steps::all_out()])
                .collect()
                .await,
        );
        runs.push(
            walk(&store.graph, vertex, vec![steps::all_in(), steps::all_out()])
                .collect()
                .await,
        );
    }
    runs
}

#[tokio::test]
async fn test_repeated_walks_match() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let first = run(&store).await;
    let second = run(&store).await;
    assert_eq!(first, second);
    assert!(first.iter().any(|paths| !paths.is_empty()));
}

#[tokio::test]
async fn test_walks_match_after_reopen() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let before = run(&store).await;

    let store = store.reopen(EngineOptions::default());
    let after = run(&store).await;

    assert_eq!(before, after);
}
