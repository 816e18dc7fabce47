//! A wildcard step from one vertex returns every outbound edge in key order.

use crate::e2e_tests::helpers::*;
use crate::query::{steps, walk};

#[tokio::test]
async fn test_all_out_yields_each_edge_once() {
    let store = TestStore::with_edges(&[["a", "p1", "b"], ["a", "p1", "f"], ["a", "p5", "j"]]);

    let paths = walk(&store.graph, "a", vec![steps::all_out()]).collect().await;

    assert_eq!(paths.len(), 3);
    assert!(paths.iter().all(|p| p.len() == 1));
    assert!(paths.iter().all(|p| p[0].s == b"a"));
    assert_eq!(objects(&paths, 0), ["b", "f", "j"]);
}

#[tokio::test]
async fn test_all_in_mirrors_all_out() {
    let store = TestStore::with_edges(&[["a", "p1", "c"], ["b", "p2", "c"], ["c", "p3", "d"]]);

    let paths = walk(&store.graph, "c", vec![steps::all_in()]).collect().await;

    // Inbound matches carry the source vertex in the object slot.
    assert_eq!(objects(&paths, 0), ["a", "b"]);
    assert!(paths.iter().all(|p| p[0].s == b"c"));
}
