//! Vertex enumeration over a durable store.

use crate::e2e_tests::helpers::*;
use crate::storage::EngineOptions;
use crate::types::Vertex;

#[test]
fn test_each_subject_once_in_order() {
    let store = TestStore::with_edges(&[
        ["c", "p1", "a"],
        ["a", "p1", "b"],
        ["b", "p2", "c"],
        ["a", "p2", "c"],
        ["a", "p3", "z"],
    ]);

    let vertices: Vec<Vertex> = store.graph.vertices().unwrap().collect();
    assert_eq!(vertices, [b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

    // Objects that never appear as subjects ("z") are not vertices here.
    let store = store.reopen(EngineOptions::default());
    let again: Vec<Vertex> = store.graph.vertices().unwrap().collect();
    assert_eq!(again, vertices);
}

#[test]
fn test_do_vertices_visits_up_to_limit() {
    let store = TestStore::with_edges(&[["a", "p", "x"], ["b", "p", "x"], ["c", "p", "x"]]);
    let mut seen = Vec::new();
    store
        .graph
        .do_vertices(2, |v| {
            seen.push(String::from_utf8_lossy(v).into_owned());
            true
        })
        .unwrap();
    assert_eq!(seen, ["a", "b"]);
}
