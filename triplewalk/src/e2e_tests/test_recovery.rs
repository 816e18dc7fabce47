//! Stores survive restarts, torn writes and compaction with their walks
//! unchanged.

use std::fs::{self, OpenOptions};

use crate::e2e_tests::helpers::*;
use crate::query::{steps, walk};
use crate::storage::{EngineError, EngineOptions, GraphError};
use crate::testing::{SAMPLE_EDGES, triples};
use crate::types::{Index, Triple};

#[tokio::test]
async fn test_reopen_preserves_all_indexes() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let store = store.reopen(EngineOptions::default());

    for index in Index::ALL {
        assert_eq!(store.graph.scan(index, None).unwrap().len(), SAMPLE_EDGES.len());
    }
    let paths = walk(&store.graph, "c", vec![steps::inbound("p4")]).collect().await;
    assert_eq!(paths[0][0], Triple::from_strs(&["c", "p4", "g"]));
}

#[tokio::test]
async fn test_torn_tail_loses_only_the_torn_batch() {
    let store = TestStore::with_edges(&SAMPLE_EDGES[..4]);
    store
        .graph
        .write_indexed_triples(&triples(&SAMPLE_EDGES[4..]))
        .unwrap();

    // Cut the last batch's record in half.
    let path = store.log_path();
    let full = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(full - 10).unwrap();
    drop(file);

    let store = store.reopen(EngineOptions::default());
    assert_eq!(store.graph.scan(Index::Spo, None).unwrap().len(), 4);
    assert!(walk(&store.graph, "g", vec![steps::all_out()]).collect().await.is_empty());

    // The store keeps accepting writes after recovery.
    store
        .graph
        .write_indexed_triples(&triples(&SAMPLE_EDGES[4..]))
        .unwrap();
    let store = store.reopen(EngineOptions::default());
    assert_eq!(store.graph.scan(Index::Spo, None).unwrap().len(), SAMPLE_EDGES.len());
}

#[tokio::test]
async fn test_compaction_keeps_walk_results() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    for _ in 0..3 {
        store
            .graph
            .write_indexed_triples(&triples(&SAMPLE_EDGES))
            .unwrap();
    }
    let before = walk(&store.graph, "a", vec![steps::all_out(), steps::all_out()])
        .collect()
        .await;
    let log_before = store.graph.stats().log_bytes;

    store.graph.compact().unwrap();
    assert!(store.graph.stats().log_bytes < log_before);

    let store = store.reopen(EngineOptions::default());
    let after = walk(&store.graph, "a", vec![steps::all_out(), steps::all_out()])
        .collect()
        .await;
    assert_eq!(before, after);
}

#[test]
fn test_read_only_store_rejects_writes() {
    let store = TestStore::with_edges(&SAMPLE_EDGES);
    let store = store.reopen(EngineOptions {
        read_only: true,
        ..EngineOptions::default()
    });

    let result = store
        .graph
        .write_indexed_triple(&Triple::from_strs(&["x", "p", "y"]));
    assert!(matches!(
        result,
        Err(GraphError::Engine(EngineError::ReadOnly))
    ));
    assert_eq!(store.graph.writes(), 0);
    assert_eq!(store.graph.scan(Index::Ops, None).unwrap().len(), SAMPLE_EDGES.len());
}
